//! JSON documents and interaction scripts for the `trellis` binary.
//!
//! A document file holds one element tree or an array of them; each is
//! appended to the page body. A script file is an array of steps tagged by
//! `action`:
//!
//! ```json
//! [
//!   { "action": "click", "target": "#menu-trigger" },
//!   { "action": "key", "target": "#menu-trigger", "key": "ArrowDown" },
//!   { "action": "toast", "category": "error", "title": "Save failed" },
//!   { "action": "wait", "ms": 1000 },
//!   { "action": "sidebar", "id": "main", "command": "close" }
//! ]
//! ```
//!
//! Targets are selectors resolved against the whole document at the time the
//! step runs.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dom::{DomEvent, EventKind, Key, Markup, NodeId, Selector};
use crate::driver;
use crate::error::{Result, RuntimeError};
use crate::page::Page;
use crate::types::{SidebarAction, SidebarCommand, ToastRequest};

/// One scripted interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Click { target: String },
    Key { target: String, key: Key },
    PointerMove { target: String },
    PointerEnter { target: String },
    PointerLeave { target: String },
    /// Sets an input's value and fires an input event.
    Type { target: String, text: String },
    /// Lets time pass, running timers that fall due.
    Wait { ms: u64 },
    Toast(ToastRequest),
    Sidebar {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        command: SidebarAction,
    },
    Navigate { path: String },
    Replace { path: String },
    Back,
    Forward,
    Resize { width: u32 },
    /// Commits a picker option by value.
    Select { target: String, value: String },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DocumentFile {
    One(Markup),
    Many(Vec<Markup>),
}

/// Parses a document from JSON text.
///
/// # Errors
///
/// Returns [`RuntimeError::Json`] if the text is not a markup tree or an
/// array of them.
pub fn parse_document(json: &str) -> Result<Vec<Markup>> {
    Ok(match serde_json::from_str(json)? {
        DocumentFile::One(markup) => vec![markup],
        DocumentFile::Many(markup) => markup,
    })
}

/// Reads a document file.
///
/// # Errors
///
/// Fails if the file cannot be read or parsed.
pub fn load_document(path: &Path) -> Result<Vec<Markup>> {
    parse_document(&fs::read_to_string(path)?)
}

/// Reads a script file.
///
/// # Errors
///
/// Fails if the file cannot be read or parsed.
pub fn load_script(path: &Path) -> Result<Vec<Step>> {
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

fn resolve(page: &Page, target: &str) -> Result<NodeId> {
    let selector = Selector::parse(target)?;
    page.doc()
        .query(page.doc().body(), &selector)
        .ok_or_else(|| RuntimeError::NoMatch(target.to_string()))
}

/// Runs one step against the page.
///
/// # Errors
///
/// Fails if a target selector is invalid or matches nothing, or if a picker
/// step targets something that is not a picker. Toast requests without a
/// toaster are logged and skipped.
pub async fn run_step(page: &mut Page, step: &Step) -> Result<()> {
    match step {
        Step::Click { target } => {
            let node = resolve(page, target)?;
            page.click(node);
        }
        Step::Key { target, key } => {
            let node = resolve(page, target)?;
            page.key(node, *key);
        }
        Step::PointerMove { target } => {
            let node = resolve(page, target)?;
            page.dispatch(DomEvent::new(EventKind::PointerMove, node));
        }
        Step::PointerEnter { target } => {
            let node = resolve(page, target)?;
            page.dispatch(DomEvent::new(EventKind::PointerEnter, node));
        }
        Step::PointerLeave { target } => {
            let node = resolve(page, target)?;
            page.dispatch(DomEvent::new(EventKind::PointerLeave, node));
        }
        Step::Type { target, text } => {
            let node = resolve(page, target)?;
            page.type_text(node, text);
        }
        Step::Wait { ms } => {
            driver::run_for(page, Duration::from_millis(*ms)).await;
        }
        Step::Toast(request) => {
            if let Err(e) = page.toast(request.clone()) {
                warn!(error = %e, "skipping toast step");
            }
        }
        Step::Sidebar { id, command } => {
            page.sidebar(SidebarCommand {
                id: id.clone(),
                action: *command,
            });
        }
        Step::Navigate { path } => page.push_state(path),
        Step::Replace { path } => page.replace_state(path),
        Step::Back => {
            page.back();
        }
        Step::Forward => {
            page.forward();
        }
        Step::Resize { width } => page.resize(*width),
        Step::Select { target, value } => {
            let node = resolve(page, target)?;
            if !page.select_by_value(node, value)? {
                warn!(target = %target, value = %value, "no option with this value");
            }
        }
    }
    Ok(())
}

/// Runs every step in order, stopping at the first failure.
///
/// # Errors
///
/// See [`run_step`].
pub async fn play(page: &mut Page, steps: &[Step]) -> Result<()> {
    for (index, step) in steps.iter().enumerate() {
        run_step(page, step).await?;
        info!(step = index + 1, action = ?step, "step done");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToastCategory;

    #[test]
    fn parses_steps() {
        let json = r##"[
            { "action": "key", "target": "#t", "key": "ArrowDown" },
            { "action": "toast", "category": "error", "title": "Save failed" },
            { "action": "sidebar", "command": "open" },
            { "action": "wait", "ms": 250 },
            { "action": "back" }
        ]"##;
        let steps: Vec<Step> = serde_json::from_str(json).unwrap();
        assert_eq!(steps.len(), 5);
        assert!(matches!(&steps[0], Step::Key { key: Key::ArrowDown, .. }));
        assert!(
            matches!(&steps[1], Step::Toast(r) if r.category == ToastCategory::Error
                && r.title.as_deref() == Some("Save failed"))
        );
        assert!(matches!(
            &steps[2],
            Step::Sidebar {
                id: None,
                command: SidebarAction::Open
            }
        ));
        assert!(matches!(steps[3], Step::Wait { ms: 250 }));
        assert!(matches!(steps[4], Step::Back));
    }

    #[test]
    fn document_may_be_one_tree_or_many() {
        let one = parse_document(r#"{ "tag": "div" }"#).unwrap();
        assert_eq!(one.len(), 1);
        let many = parse_document(r#"[{ "tag": "div" }, { "tag": "span" }]"#).unwrap();
        assert_eq!(many.len(), 2);
        assert!(parse_document(r#"{ "attrs": {} }"#).is_err());
    }

    #[tokio::test]
    async fn unknown_target_is_an_error() {
        let mut page = Page::new(crate::Config::default()).unwrap();
        page.start();
        let err = run_step(
            &mut page,
            &Step::Click {
                target: "#missing".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RuntimeError::NoMatch(t) if t == "#missing"));
    }
}
