//! Receipt template model, store, and resolver.
//!
//! One template row per (branch, transaction kind). The resolver never
//! fails: a missing row is created lazily from branch metadata, and any
//! database failure degrades to a hardcoded fallback template so a
//! receipt can always be printed.

use chrono::Utc;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::DbState;
use crate::transaction::TransactionKind;

/// A stored receipt template.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Template {
    pub id: String,
    pub branch_id: String,
    pub template_name: String,
    pub business_name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub social_handle: Option<String>,
    pub tagline: Option<String>,
    pub return_policy: Option<String>,
    pub return_policy_alt: Option<String>,
    pub thank_you_message: Option<String>,
    pub footer_text: Option<String>,
    pub show_qr_section: bool,
    pub show_policy_section: bool,
    pub show_points_section: bool,
    pub show_tagline: bool,
    pub is_default: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Partial update for `update_template`; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplatePatch {
    pub business_name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub social_handle: Option<String>,
    pub tagline: Option<String>,
    pub return_policy: Option<String>,
    pub return_policy_alt: Option<String>,
    pub thank_you_message: Option<String>,
    pub footer_text: Option<String>,
    pub show_qr_section: Option<bool>,
    pub show_policy_section: Option<bool>,
    pub show_points_section: Option<bool>,
    pub show_tagline: Option<bool>,
    pub is_default: Option<bool>,
}

/// Branch metadata copied into lazily created templates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Branch {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

/// How a template was obtained by the resolver.
#[derive(Debug, Clone)]
pub enum TemplateResolution {
    /// Found an existing row for (branch, kind).
    Stored(Template),
    /// No row existed; one was created from defaults + branch metadata.
    Created(Template),
    /// Store access failed; hardcoded fallback with the failure reason.
    Degraded(Template, String),
}

impl TemplateResolution {
    pub fn template(&self) -> &Template {
        match self {
            TemplateResolution::Stored(t) => t,
            TemplateResolution::Created(t) => t,
            TemplateResolution::Degraded(t, _) => t,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, TemplateResolution::Degraded(_, _))
    }
}

const DEFAULT_THANK_YOU: &str = "Thank you for your support!";

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

/// The hardcoded last-resort template. All toggles on so nothing a
/// merchant configured is silently hidden when the store is unreachable.
pub fn fallback_template(kind: TransactionKind, branch_id: &str) -> Template {
    let now = Utc::now().to_rfc3339();
    Template {
        id: String::new(),
        branch_id: branch_id.to_string(),
        template_name: kind.template_name().to_string(),
        business_name: "RECEIPT".to_string(),
        thank_you_message: Some(DEFAULT_THANK_YOU.to_string()),
        show_qr_section: true,
        show_policy_section: true,
        show_points_section: true,
        show_tagline: true,
        created_at: now.clone(),
        updated_at: now,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Resolve the template for a transaction kind at a branch.
///
/// Lookup is by `(branch_id, kind.template_name())`. If no row exists one
/// is created by copying defaults plus the branch's name/address/phone.
/// Never returns an error: on any failure the hardcoded fallback is
/// returned as `Degraded` and the reason is logged.
pub fn resolve_template(
    db: &DbState,
    kind: TransactionKind,
    branch_id: &str,
) -> TemplateResolution {
    match try_resolve(db, kind, branch_id) {
        Ok(res) => res,
        Err(reason) => {
            warn!(
                kind = kind.template_name(),
                branch = branch_id,
                reason = %reason,
                "Template resolution degraded to fallback"
            );
            TemplateResolution::Degraded(fallback_template(kind, branch_id), reason)
        }
    }
}

fn try_resolve(
    db: &DbState,
    kind: TransactionKind,
    branch_id: &str,
) -> Result<TemplateResolution, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let name = kind.template_name();

    // Oldest row wins so concurrent lazy creation stays stable
    let existing = conn
        .query_row(
            &format!(
                "SELECT {TEMPLATE_COLUMNS} FROM receipt_templates
                 WHERE branch_id = ?1 AND template_name = ?2
                 ORDER BY created_at ASC LIMIT 1"
            ),
            params![branch_id, name],
            row_to_template,
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(format!("template lookup: {other}")),
        })?;

    if let Some(tpl) = existing {
        return Ok(TemplateResolution::Stored(tpl));
    }

    // Lazily create from branch metadata
    let branch: Option<Branch> = conn
        .query_row(
            "SELECT id, name, address, phone FROM branches WHERE id = ?1",
            params![branch_id],
            |row| {
                Ok(Branch {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    address: row.get(2)?,
                    phone: row.get(3)?,
                })
            },
        )
        .ok();

    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();
    let business_name = branch
        .as_ref()
        .map(|b| b.name.clone())
        .unwrap_or_else(|| "RECEIPT".to_string());
    let address = branch.as_ref().and_then(|b| b.address.clone());
    let phone = branch.as_ref().and_then(|b| b.phone.clone());

    conn.execute(
        "INSERT INTO receipt_templates (id, branch_id, template_name, business_name,
                                        address, phone, thank_you_message,
                                        show_qr_section, show_policy_section,
                                        show_points_section, show_tagline,
                                        is_default, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, 1, 1, 1, 0, ?8, ?8)",
        params![id, branch_id, name, business_name, address, phone, DEFAULT_THANK_YOU, now],
    )
    .map_err(|e| format!("template create: {e}"))?;

    info!(
        kind = name,
        branch = branch_id,
        id = %id,
        "Created receipt template from branch defaults"
    );

    Ok(TemplateResolution::Created(Template {
        id,
        branch_id: branch_id.to_string(),
        template_name: name.to_string(),
        business_name,
        address,
        phone,
        thank_you_message: Some(DEFAULT_THANK_YOU.to_string()),
        show_qr_section: true,
        show_policy_section: true,
        show_points_section: true,
        show_tagline: true,
        is_default: false,
        created_at: now.clone(),
        updated_at: now,
        ..Default::default()
    }))
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

const TEMPLATE_COLUMNS: &str = "id, branch_id, template_name, business_name, address, phone,
     website, social_handle, tagline, return_policy, return_policy_alt,
     thank_you_message, footer_text, show_qr_section, show_policy_section,
     show_points_section, show_tagline, is_default, created_at, updated_at";

fn row_to_template(row: &rusqlite::Row<'_>) -> rusqlite::Result<Template> {
    Ok(Template {
        id: row.get(0)?,
        branch_id: row.get(1)?,
        template_name: row.get(2)?,
        business_name: row.get(3)?,
        address: row.get(4)?,
        phone: row.get(5)?,
        website: row.get(6)?,
        social_handle: row.get(7)?,
        tagline: row.get(8)?,
        return_policy: row.get(9)?,
        return_policy_alt: row.get(10)?,
        thank_you_message: row.get(11)?,
        footer_text: row.get(12)?,
        show_qr_section: row.get::<_, i32>(13)? != 0,
        show_policy_section: row.get::<_, i32>(14)? != 0,
        show_points_section: row.get::<_, i32>(15)? != 0,
        show_tagline: row.get::<_, i32>(16)? != 0,
        is_default: row.get::<_, i32>(17)? != 0,
        created_at: row.get(18)?,
        updated_at: row.get(19)?,
    })
}

/// Create a template. The id and timestamps are generated; returns the id.
pub fn create_template(db: &DbState, tpl: &Template) -> Result<String, String> {
    let branch_id = non_empty(Some(tpl.branch_id.as_str())).ok_or("Missing branch_id")?;
    let template_name = non_empty(Some(tpl.template_name.as_str())).ok_or("Missing template_name")?;
    let business_name = non_empty(Some(tpl.business_name.as_str())).ok_or("Missing business_name")?;

    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    conn.execute(
        "INSERT INTO receipt_templates (id, branch_id, template_name, business_name,
                                        address, phone, website, social_handle, tagline,
                                        return_policy, return_policy_alt,
                                        thank_you_message, footer_text,
                                        show_qr_section, show_policy_section,
                                        show_points_section, show_tagline,
                                        is_default, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                 ?14, ?15, ?16, ?17, 0, ?18, ?18)",
        params![
            id,
            branch_id,
            template_name,
            business_name,
            tpl.address,
            tpl.phone,
            tpl.website,
            tpl.social_handle,
            tpl.tagline,
            tpl.return_policy,
            tpl.return_policy_alt,
            tpl.thank_you_message,
            tpl.footer_text,
            tpl.show_qr_section as i32,
            tpl.show_policy_section as i32,
            tpl.show_points_section as i32,
            tpl.show_tagline as i32,
            now,
        ],
    )
    .map_err(|e| format!("create template: {e}"))?;

    if tpl.is_default {
        set_default_template_locked(&conn, &id, &branch_id)?;
    }

    info!(id = %id, branch = %branch_id, name = %template_name, "Receipt template created");
    Ok(id)
}

/// Update a template from a patch. Builds a dynamic SET clause from the
/// provided fields; `is_default = true` routes through the default-marking
/// path so the branch's previous default is cleared first.
pub fn update_template(db: &DbState, id: &str, patch: &TemplatePatch) -> Result<(), String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let now = Utc::now().to_rfc3339();

    let mut sets = Vec::new();
    let mut vals: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(raw) = patch.business_name.as_deref() {
        let v = raw.trim();
        if v.is_empty() {
            return Err("business_name cannot be empty".into());
        }
        sets.push("business_name = ?");
        vals.push(Box::new(v.to_string()));
    }
    if let Some(v) = patch.address.as_deref() {
        sets.push("address = ?");
        vals.push(Box::new(v.to_string()));
    }
    if let Some(v) = patch.phone.as_deref() {
        sets.push("phone = ?");
        vals.push(Box::new(v.to_string()));
    }
    if let Some(v) = patch.website.as_deref() {
        sets.push("website = ?");
        vals.push(Box::new(v.to_string()));
    }
    if let Some(v) = patch.social_handle.as_deref() {
        sets.push("social_handle = ?");
        vals.push(Box::new(v.to_string()));
    }
    if let Some(v) = patch.tagline.as_deref() {
        sets.push("tagline = ?");
        vals.push(Box::new(v.to_string()));
    }
    if let Some(v) = patch.return_policy.as_deref() {
        sets.push("return_policy = ?");
        vals.push(Box::new(v.to_string()));
    }
    if let Some(v) = patch.return_policy_alt.as_deref() {
        sets.push("return_policy_alt = ?");
        vals.push(Box::new(v.to_string()));
    }
    if let Some(v) = patch.thank_you_message.as_deref() {
        sets.push("thank_you_message = ?");
        vals.push(Box::new(v.to_string()));
    }
    if let Some(v) = patch.footer_text.as_deref() {
        sets.push("footer_text = ?");
        vals.push(Box::new(v.to_string()));
    }
    if let Some(v) = patch.show_qr_section {
        sets.push("show_qr_section = ?");
        vals.push(Box::new(v as i32));
    }
    if let Some(v) = patch.show_policy_section {
        sets.push("show_policy_section = ?");
        vals.push(Box::new(v as i32));
    }
    if let Some(v) = patch.show_points_section {
        sets.push("show_points_section = ?");
        vals.push(Box::new(v as i32));
    }
    if let Some(v) = patch.show_tagline {
        sets.push("show_tagline = ?");
        vals.push(Box::new(v as i32));
    }

    if sets.is_empty() && patch.is_default.is_none() {
        return Err("No fields to update".into());
    }

    if !sets.is_empty() {
        sets.push("updated_at = ?");
        vals.push(Box::new(now.clone()));
        vals.push(Box::new(id.to_string()));

        let sql = format!(
            "UPDATE receipt_templates SET {} WHERE id = ?",
            sets.join(", ")
        );

        let params_refs: Vec<&dyn rusqlite::types::ToSql> =
            vals.iter().map(|v| v.as_ref()).collect();
        let affected = conn
            .execute(&sql, params_refs.as_slice())
            .map_err(|e| format!("update template: {e}"))?;

        if affected == 0 {
            return Err(format!("Template {id} not found"));
        }
    } else {
        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM receipt_templates WHERE id = ?1)",
                params![id],
                |row| row.get(0),
            )
            .map_err(|e| format!("lookup template: {e}"))?;
        if !exists {
            return Err(format!("Template {id} not found"));
        }
    }

    match patch.is_default {
        Some(true) => {
            let branch_id: String = conn
                .query_row(
                    "SELECT branch_id FROM receipt_templates WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .map_err(|e| format!("lookup template branch: {e}"))?;
            set_default_template_locked(&conn, id, &branch_id)?;
        }
        Some(false) => {
            conn.execute(
                "UPDATE receipt_templates SET is_default = 0, updated_at = ?1 WHERE id = ?2",
                params![Utc::now().to_rfc3339(), id],
            )
            .map_err(|e| format!("clear template default flag: {e}"))?;
        }
        None => {}
    }

    info!(id = %id, "Receipt template updated");
    Ok(())
}

/// Clear the branch's existing default, then mark the given template.
/// At most one default per branch.
fn set_default_template_locked(
    conn: &rusqlite::Connection,
    template_id: &str,
    branch_id: &str,
) -> Result<(), String> {
    conn.execute(
        "UPDATE receipt_templates SET is_default = 0 WHERE branch_id = ?1",
        params![branch_id],
    )
    .map_err(|e| format!("clear existing default template flags: {e}"))?;
    conn.execute(
        "UPDATE receipt_templates SET is_default = 1, updated_at = ?1 WHERE id = ?2",
        params![Utc::now().to_rfc3339(), template_id],
    )
    .map_err(|e| format!("set template default flag: {e}"))?;
    Ok(())
}

/// Mark a template as the branch default.
pub fn set_default_template(db: &DbState, template_id: &str) -> Result<(), String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let branch_id: String = conn
        .query_row(
            "SELECT branch_id FROM receipt_templates WHERE id = ?1",
            params![template_id],
            |row| row.get(0),
        )
        .map_err(|e| format!("lookup template branch: {e}"))?;
    set_default_template_locked(&conn, template_id, &branch_id)?;
    info!(id = %template_id, branch = %branch_id, "Default receipt template set");
    Ok(())
}

/// Fetch a template by id.
pub fn get_template(db: &DbState, template_id: &str) -> Result<Template, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    conn.query_row(
        &format!("SELECT {TEMPLATE_COLUMNS} FROM receipt_templates WHERE id = ?1"),
        params![template_id],
        row_to_template,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => format!("Template {template_id} not found"),
        other => format!("get template: {other}"),
    })
}

/// List a branch's templates, oldest first.
pub fn list_templates(db: &DbState, branch_id: &str) -> Result<Vec<Template>, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM receipt_templates
             WHERE branch_id = ?1 ORDER BY created_at ASC"
        ))
        .map_err(|e| e.to_string())?;

    let rows = stmt
        .query_map(params![branch_id], row_to_template)
        .map_err(|e| format!("list templates: {e}"))?;

    Ok(rows.filter_map(|r| r.ok()).collect())
}

/// Delete a template. The branch default is refused.
pub fn delete_template(db: &DbState, template_id: &str) -> Result<(), String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let is_default: bool = conn
        .query_row(
            "SELECT is_default FROM receipt_templates WHERE id = ?1",
            params![template_id],
            |row| row.get::<_, i32>(0).map(|v| v != 0),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => format!("Template {template_id} not found"),
            other => format!("lookup template: {other}"),
        })?;

    if is_default {
        return Err("Cannot delete the default template".into());
    }

    conn.execute(
        "DELETE FROM receipt_templates WHERE id = ?1",
        params![template_id],
    )
    .map_err(|e| format!("delete template: {e}"))?;

    info!(id = %template_id, "Receipt template deleted");
    Ok(())
}

// ---------------------------------------------------------------------------
// Branches
// ---------------------------------------------------------------------------

/// Insert or update branch metadata.
pub fn upsert_branch(db: &DbState, branch: &Branch) -> Result<(), String> {
    let id = non_empty(Some(branch.id.as_str())).ok_or("Missing branch id")?;
    let name = non_empty(Some(branch.name.as_str())).ok_or("Missing branch name")?;

    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    conn.execute(
        "INSERT INTO branches (id, name, address, phone, updated_at)
         VALUES (?1, ?2, ?3, ?4, datetime('now'))
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            address = excluded.address,
            phone = excluded.phone,
            updated_at = excluded.updated_at",
        params![id, name, branch.address, branch.phone],
    )
    .map_err(|e| format!("upsert branch: {e}"))?;
    Ok(())
}

/// Fetch branch metadata by id.
pub fn get_branch(db: &DbState, branch_id: &str) -> Result<Branch, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    conn.query_row(
        "SELECT id, name, address, phone FROM branches WHERE id = ?1",
        params![branch_id],
        |row| {
            Ok(Branch {
                id: row.get(0)?,
                name: row.get(1)?,
                address: row.get(2)?,
                phone: row.get(3)?,
            })
        },
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => format!("Branch {branch_id} not found"),
        other => format!("get branch: {other}"),
    })
}

// ===========================================================================
// Tests
// ===========================================================================
