//! Presentation-neutral views and the builders that produce them.
//!
//! A [`View`] is an ordered list of blocks. Transports translate blocks into
//! whatever component model they speak; builders here only decide content,
//! ordering and the navigation tokens carried by interactive blocks.

use std::collections::HashSet;

use serde::Serialize;

use crate::application::transport::InteractionContext;
use crate::domain::catalog::CatalogItem;
use crate::domain::error::NavError;
use crate::domain::pagination::PageWindow;
use crate::domain::token::{CommandId, NavigationToken};

/// Related works listed per detail page.
pub const DETAIL_PAGE_SIZE: usize = 7;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct View {
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Heading {
        text: String,
    },
    Text {
        text: String,
    },
    Divider,
    Item {
        /// 1-based position inside the whole result set.
        position: usize,
        title: String,
        subtitle: Option<String>,
        thumbnail: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        action: Option<Button>,
    },
    SelectMenu {
        custom_id: String,
        placeholder: String,
        options: Vec<MenuOption>,
    },
    Buttons {
        buttons: Vec<Button>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuOption {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    pub custom_id: String,
    pub label: String,
    pub disabled: bool,
}

impl View {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single-paragraph view, used for notices and error replies.
    pub fn notice(heading: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new()
            .with(Block::Heading {
                text: heading.into(),
            })
            .with(Block::Text { text: text.into() })
    }

    pub fn with(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    /// Titles of the item blocks, in display order.
    pub fn item_titles(&self) -> Vec<&str> {
        self.blocks
            .iter()
            .filter_map(|block| match block {
                Block::Item { title, .. } => Some(title.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Every custom id carried by the view's interactive blocks.
    pub fn custom_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        for block in &self.blocks {
            match block {
                Block::Item {
                    action: Some(button),
                    ..
                } => ids.push(button.custom_id.as_str()),
                Block::SelectMenu { custom_id, .. } => ids.push(custom_id.as_str()),
                Block::Buttons { buttons } => {
                    ids.extend(buttons.iter().map(|button| button.custom_id.as_str()))
                }
                _ => {}
            }
        }
        ids
    }
}

/// Decides whether item thumbnails may be shown to an audience.
#[derive(Debug, Clone, Default)]
pub struct ImagePolicy {
    allow_list: HashSet<String>,
    placeholder_url: String,
}

impl ImagePolicy {
    pub fn new(allow_list: impl IntoIterator<Item = String>, placeholder_url: String) -> Self {
        Self {
            allow_list: allow_list.into_iter().collect(),
            placeholder_url,
        }
    }

    pub fn allows(&self, ctx: &InteractionContext) -> bool {
        self.allow_list.contains(ctx.audience())
    }

    /// The item's own image for allow-listed audiences, else the placeholder.
    pub fn thumbnail(&self, ctx: &InteractionContext, image_url: Option<&str>) -> String {
        match image_url.map(str::trim) {
            Some(url) if !url.is_empty() && self.allows(ctx) => url.to_string(),
            _ => self.placeholder_url.clone(),
        }
    }
}

/// Fixed inputs of a list view that do not depend on the cached value.
pub struct ListLayout<'a> {
    pub command_id: &'a CommandId,
    pub heading: &'a str,
    pub page_size: usize,
    pub images: &'a ImagePolicy,
    pub ctx: &'a InteractionContext,
}

/// Render one page of a search result set.
///
/// The requested page is clamped into range here; callers pass it through
/// untouched.
pub fn result_list(
    layout: &ListLayout<'_>,
    items: &[CatalogItem],
    page: u32,
    session: &str,
) -> Result<View, NavError> {
    let window = PageWindow::clamp(items.len(), layout.page_size, page);
    let command = layout.command_id.as_str();

    let mut view = View::new()
        .with(Block::Heading {
            text: layout.heading.to_string(),
        })
        .with(Block::Text {
            text: format!("{} results", items.len()),
        })
        .with(Block::Divider);

    let shown = window.slice(items);
    for (offset, item) in shown.iter().enumerate() {
        view = view.with(Block::Item {
            position: window.start + offset + 1,
            title: item.display_name().to_string(),
            subtitle: subtitle(item),
            thumbnail: layout.images.thumbnail(layout.ctx, item.image_url.as_deref()),
            action: Some(Button {
                custom_id: NavigationToken::detail_button(command, session, &item.id)?.encode(),
                label: "Details".to_string(),
                disabled: false,
            }),
        });
    }

    view = view.with(Block::Divider);
    if !shown.is_empty() {
        view = view.with(Block::SelectMenu {
            custom_id: NavigationToken::select_menu(command, session)?.encode(),
            placeholder: "Pick an entry for details".to_string(),
            options: shown
                .iter()
                .map(|item| MenuOption {
                    label: item.display_name().to_string(),
                    value: item.id.clone(),
                })
                .collect(),
        });
    }

    Ok(view
        .with(Block::Text {
            text: format!("Page {}/{}", window.page, window.total_pages),
        })
        .with(page_buttons(command, session, &window)?))
}

fn page_buttons(command: &str, session: &str, window: &PageWindow) -> Result<Block, NavError> {
    // Out-of-range neighbors are left for the next build to clamp; this keeps
    // the two ids distinct on single-page results.
    let previous = window.page - 1;
    let next = window.page + 1;
    Ok(Block::Buttons {
        buttons: vec![
            Button {
                custom_id: NavigationToken::page(command, session, page_number(previous))?.encode(),
                label: "Previous".to_string(),
                disabled: !window.has_previous(),
            },
            Button {
                custom_id: NavigationToken::page(command, session, page_number(next))?.encode(),
                label: "Next".to_string(),
                disabled: !window.has_next(),
            },
        ],
    })
}

fn page_number(page: usize) -> u32 {
    u32::try_from(page).unwrap_or(u32::MAX)
}

fn subtitle(item: &CatalogItem) -> Option<String> {
    (item.display_name() != item.title).then(|| item.title.clone())
}

/// Fixed inputs of a detail view.
pub struct DetailLayout<'a> {
    /// List command, used by the way back to the results.
    pub command_id: &'a CommandId,
    /// Command paging through the entry's related works.
    pub detail_command_id: &'a CommandId,
    pub images: &'a ImagePolicy,
    pub ctx: &'a InteractionContext,
}

/// Session handles a detail view is bound to.
#[derive(Debug, Clone, Copy)]
pub struct DetailSessions<'a> {
    /// Result set the entry was picked from.
    pub list: &'a str,
    /// The entry itself, for paging its works.
    pub entry: &'a str,
}

/// Render a single entry with a button back to page one of its result set.
///
/// Related works are paged [`DETAIL_PAGE_SIZE`] at a time under the detail
/// command; an entry without works gets no pager.
pub fn detail(
    layout: &DetailLayout<'_>,
    item: &CatalogItem,
    page: u32,
    sessions: DetailSessions<'_>,
) -> Result<View, NavError> {
    let mut view = View::new()
        .with(Block::Heading {
            text: item.display_name().to_string(),
        })
        .with(Block::Divider)
        .with(Block::Item {
            position: 1,
            title: item.title.clone(),
            subtitle: (!item.aliases.is_empty()).then(|| item.aliases.join(", ")),
            thumbnail: layout.images.thumbnail(layout.ctx, item.image_url.as_deref()),
            action: None,
        });

    if !item.summary.trim().is_empty() {
        view = view.with(Block::Text {
            text: item.summary.clone(),
        });
    }

    if !item.works.is_empty() {
        let window = PageWindow::clamp(item.works.len(), DETAIL_PAGE_SIZE, page);
        let listed = window
            .slice(&item.works)
            .iter()
            .enumerate()
            .map(|(offset, work)| format!("{}. {work}", window.start + offset + 1))
            .collect::<Vec<_>>()
            .join("\n");
        view = view
            .with(Block::Divider)
            .with(Block::Text {
                text: format!("Works ({})", item.works.len()),
            })
            .with(Block::Text { text: listed })
            .with(Block::Text {
                text: format!("Page {}/{}", window.page, window.total_pages),
            })
            .with(page_buttons(
                layout.detail_command_id.as_str(),
                sessions.entry,
                &window,
            )?);
    }

    Ok(view.with(Block::Divider).with(Block::Buttons {
        buttons: vec![Button {
            custom_id: NavigationToken::back_to_home(layout.command_id.as_str(), sessions.list)?
                .encode(),
            label: "Back to results".to_string(),
            disabled: false,
        }],
    }))
}
