//! Feature reordering: `dashsync reorder`.

use anyhow::{Context, Result, bail};
use console::style;

use dashsync::config::DashConfig;
use dashsync::sync::models::OrderEntry;
use dashsync::sync::render::NullSink;
use dashsync::sync::reorder::{DragSession, Rect};

pub enum ReorderRequest {
    /// Full order of the reorderable features, first to last.
    Order(Vec<String>),
    /// Move one feature relative to a sibling.
    Move {
        id: String,
        above: Option<String>,
        below: Option<String>,
    },
}

pub async fn cmd_reorder(config: &DashConfig, request: ReorderRequest) -> Result<()> {
    let mut session = super::open_project_session(config, Box::new(NullSink)).await?;
    let project = super::require_project(config)?;

    let emitted = match request {
        ReorderRequest::Order(ids) => {
            if ids.is_empty() {
                bail!("Give the new order as feature ids, or use --move");
            }
            ids.iter()
                .enumerate()
                .map(|(i, id)| OrderEntry {
                    id: id.clone(),
                    order_index: i as i64 + 1,
                })
                .collect()
        }
        ReorderRequest::Move { id, above, below } => {
            let container: Vec<String> = session
                .store()
                .cache
                .display_order(project)
                .into_iter()
                .filter(|f| f.priority.is_reorderable())
                .map(|f| f.id.clone())
                .collect();
            let mut drag = DragSession::pick_up(&container, &id)
                .with_context(|| format!("'{}' is not a reorderable feature of this project", id))?;
            // One row of unit height: upper half means above.
            let row = Rect::new(0.0, 1.0);
            let moved = match (above, below) {
                (Some(sibling), _) => drag.drag_over(&sibling, 0.25, row),
                (None, Some(sibling)) => drag.drag_over(&sibling, 0.75, row),
                (None, None) => bail!("--move needs --above or --below"),
            };
            if !moved {
                let dragged = drag.dragged().to_string();
                let original = drag.cancel();
                println!(
                    "'{}' is already there. Order unchanged: {}",
                    dragged,
                    original.join(", ")
                );
                return Ok(());
            }
            drag.finish()
        }
    };

    let saved = session.reorder(&emitted).await?;
    println!("{}", style("Saved order:").green());
    for entry in saved {
        println!("  {:>3}. {}", entry.order_index, entry.id);
    }
    Ok(())
}
