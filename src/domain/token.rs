//! Navigation token ("CID") model and codec.
//!
//! A token records where a user is inside a rendered result set: which
//! feature minted it, which UI behavior it belongs to, which session it
//! refers to and a small behavior-specific value.
//!
//! Two wire forms exist:
//!
//! - **Compact** (`<command><behavior>~<cache_id>~<value>`), the only form
//!   produced by [`NavigationToken::encode`].
//! - **Legacy** (`<command>|<value>|...`), accepted by [`decode`] for
//!   components minted before the compact form existed.
//!
//! The two forms never mix: any `|` routes the whole string to the legacy
//! parser.

use std::fmt;

use serde::Serialize;

use super::error::NavError;
use super::types::{Behavior, Domain};

/// Reserved delimiter between the compact head, cache id and value.
pub const COMPACT_DELIMITER: char = '~';
/// Field separator of the legacy form.
pub const LEGACY_SEPARATOR: char = '|';
/// Custom-identifier ceiling enforced by the transport.
pub const MAX_TOKEN_LEN: usize = 100;

const MIN_COMMAND_ID_LEN: usize = 2;
const MAX_COMMAND_ID_LEN: usize = 3;

/// Short feature code: a domain tag followed by 1-2 sub-mode characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CommandId(String);

impl CommandId {
    pub fn parse(raw: &str) -> Result<Self, NavError> {
        let len = raw.chars().count();
        if !(MIN_COMMAND_ID_LEN..=MAX_COMMAND_ID_LEN).contains(&len) {
            return Err(NavError::malformed(format!(
                "command id `{raw}` must be {MIN_COMMAND_ID_LEN}-{MAX_COMMAND_ID_LEN} characters"
            )));
        }
        if !raw.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(NavError::malformed(format!(
                "command id `{raw}` must be ASCII alphanumeric"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First character, used as the routing key.
    pub fn domain_tag(&self) -> char {
        // Length is validated on construction, so the first char exists.
        self.0.chars().next().unwrap_or_default()
    }

    pub fn domain(&self) -> Option<Domain> {
        Domain::from_tag(self.domain_tag())
    }

    /// Characters after the domain tag, e.g. `1` for `H1` or `D2` for `CD2`.
    pub fn sub_mode(&self) -> &str {
        &self.0[1..]
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decoded compact token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationToken {
    command_id: CommandId,
    behavior: Behavior,
    cache_id: String,
    value: String,
}

/// Decoded legacy token: the first field names the command, the rest are
/// positional values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegacyToken {
    pub command: String,
    pub values: Vec<String>,
}

impl LegacyToken {
    pub fn value(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }
}

/// Result of [`decode`]; which variant is produced depends solely on the
/// presence of the legacy separator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum DecodedToken {
    Compact(NavigationToken),
    Legacy(LegacyToken),
}

/// Decode a raw custom identifier into a token.
pub fn decode(raw: &str) -> Result<DecodedToken, NavError> {
    if raw.is_empty() {
        return Err(NavError::malformed("token is empty"));
    }

    if raw.contains(LEGACY_SEPARATOR) {
        return decode_legacy(raw).map(DecodedToken::Legacy);
    }

    NavigationToken::decode(raw).map(DecodedToken::Compact)
}

fn decode_legacy(raw: &str) -> Result<LegacyToken, NavError> {
    let mut fields = raw.split(LEGACY_SEPARATOR).map(str::to_string);
    let command = fields.next().unwrap_or_default();
    if command.is_empty() {
        return Err(NavError::malformed("legacy token has an empty command field"));
    }
    Ok(LegacyToken {
        command,
        values: fields.collect(),
    })
}

impl NavigationToken {
    /// Build a token, rejecting anything that would not survive a
    /// round-trip through [`encode`](Self::encode) and [`decode`].
    pub fn new(
        command_id: &str,
        behavior: Behavior,
        cache_id: &str,
        value: &str,
    ) -> Result<Self, NavError> {
        let token = Self::from_parts(CommandId::parse(command_id)?, behavior, cache_id, value)?;
        let encoded_len = token.encoded_len();
        if encoded_len > MAX_TOKEN_LEN {
            return Err(NavError::malformed(format!(
                "encoded token is {encoded_len} characters, ceiling is {MAX_TOKEN_LEN}"
            )));
        }
        Ok(token)
    }

    pub fn page(command_id: &str, cache_id: &str, page: u32) -> Result<Self, NavError> {
        Self::new(command_id, Behavior::Page, cache_id, &page.to_string())
    }

    /// Select-menu tokens carry no value; the transport supplies the
    /// selected option when the menu is used.
    pub fn select_menu(command_id: &str, cache_id: &str) -> Result<Self, NavError> {
        Self::new(command_id, Behavior::SelectMenu, cache_id, "")
    }

    pub fn back_to_home(command_id: &str, cache_id: &str) -> Result<Self, NavError> {
        Self::new(command_id, Behavior::BackToHome, cache_id, "")
    }

    pub fn detail_button(command_id: &str, cache_id: &str, item_id: &str) -> Result<Self, NavError> {
        Self::new(command_id, Behavior::DetailButton, cache_id, item_id)
    }

    fn from_parts(
        command_id: CommandId,
        behavior: Behavior,
        cache_id: &str,
        value: &str,
    ) -> Result<Self, NavError> {
        if cache_id.is_empty() {
            return Err(NavError::malformed("cache id is empty"));
        }
        if !cache_id.chars().all(is_cache_id_char) {
            return Err(NavError::malformed(format!(
                "cache id `{cache_id}` contains characters outside [A-Za-z0-9_-]"
            )));
        }
        if !value.chars().all(is_value_char) {
            return Err(NavError::malformed(format!(
                "value `{value}` contains reserved or non-printable characters"
            )));
        }
        Ok(Self {
            command_id,
            behavior,
            cache_id: cache_id.to_string(),
            value: value.to_string(),
        })
    }

    /// Serialize to the compact form.
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(self.encoded_len());
        out.push_str(self.command_id.as_str());
        out.push(self.behavior.tag());
        out.push(COMPACT_DELIMITER);
        out.push_str(&self.cache_id);
        out.push(COMPACT_DELIMITER);
        out.push_str(&self.value);
        out
    }

    fn encoded_len(&self) -> usize {
        self.command_id.as_str().len() + 1 + 1 + self.cache_id.len() + 1 + self.value.len()
    }

    fn decode(raw: &str) -> Result<Self, NavError> {
        let mut parts = raw.splitn(3, COMPACT_DELIMITER);
        let head = parts.next().unwrap_or_default();
        let (Some(cache_id), Some(value)) = (parts.next(), parts.next()) else {
            return Err(NavError::malformed(format!(
                "expected two `{COMPACT_DELIMITER}` delimiters"
            )));
        };
        if value.contains(COMPACT_DELIMITER) {
            return Err(NavError::malformed(format!(
                "unexpected extra `{COMPACT_DELIMITER}` delimiter"
            )));
        }

        let mut head_chars = head.chars();
        let Some(tag) = head_chars.next_back() else {
            return Err(NavError::malformed("missing command id and behavior tag"));
        };
        let behavior = Behavior::from_tag(tag)
            .ok_or_else(|| NavError::malformed(format!("unknown behavior tag `{tag}`")))?;
        let command_id = CommandId::parse(head_chars.as_str())?;

        Self::from_parts(command_id, behavior, cache_id, value)
    }

    pub fn command_id(&self) -> &CommandId {
        &self.command_id
    }

    pub fn behavior(&self) -> Behavior {
        self.behavior
    }

    pub fn cache_id(&self) -> &str {
        &self.cache_id
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Replace the value, e.g. with the option picked from a select menu.
    pub fn with_value(&self, value: &str) -> Result<Self, NavError> {
        Self::from_parts(self.command_id.clone(), self.behavior, &self.cache_id, value)
    }

    /// Narrow the token to the view expected by a handler.
    pub fn project(&self, target: Behavior) -> Result<NarrowToken, NavError> {
        match target {
            Behavior::Page => self.to_page().map(NarrowToken::Page),
            Behavior::SelectMenu => self.to_select_menu().map(NarrowToken::SelectMenu),
            Behavior::BackToHome => self.to_back_to_home().map(NarrowToken::BackToHome),
            Behavior::DetailButton => self.to_detail_button().map(NarrowToken::DetailButton),
        }
    }

    pub fn to_page(&self) -> Result<PageView, NavError> {
        self.expect_behavior(Behavior::Page)?;
        let page = self.value.parse::<u32>().map_err(|_| {
            NavError::malformed(format!("page value `{}` is not a page number", self.value))
        })?;
        Ok(PageView {
            command_id: self.command_id.clone(),
            cache_id: self.cache_id.clone(),
            page,
        })
    }

    pub fn to_select_menu(&self) -> Result<SelectMenuView, NavError> {
        self.expect_behavior(Behavior::SelectMenu)?;
        Ok(SelectMenuView {
            command_id: self.command_id.clone(),
            cache_id: self.cache_id.clone(),
            item_id: self.required_item_id()?,
        })
    }

    pub fn to_back_to_home(&self) -> Result<BackToHomeView, NavError> {
        self.expect_behavior(Behavior::BackToHome)?;
        Ok(BackToHomeView {
            command_id: self.command_id.clone(),
            cache_id: self.cache_id.clone(),
        })
    }

    pub fn to_detail_button(&self) -> Result<DetailButtonView, NavError> {
        self.expect_behavior(Behavior::DetailButton)?;
        Ok(DetailButtonView {
            command_id: self.command_id.clone(),
            cache_id: self.cache_id.clone(),
            item_id: self.required_item_id()?,
        })
    }

    fn expect_behavior(&self, expected: Behavior) -> Result<(), NavError> {
        if self.behavior != expected {
            return Err(NavError::BehaviorMismatch {
                expected,
                actual: self.behavior,
            });
        }
        Ok(())
    }

    fn required_item_id(&self) -> Result<String, NavError> {
        if self.value.is_empty() {
            return Err(NavError::malformed(format!(
                "{} token carries no item id",
                self.behavior
            )));
        }
        Ok(self.value.clone())
    }
}

impl fmt::Display for NavigationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Behavior-specific view over a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarrowToken {
    Page(PageView),
    SelectMenu(SelectMenuView),
    BackToHome(BackToHomeView),
    DetailButton(DetailButtonView),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView {
    pub command_id: CommandId,
    pub cache_id: String,
    pub page: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectMenuView {
    pub command_id: CommandId,
    pub cache_id: String,
    pub item_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackToHomeView {
    pub command_id: CommandId,
    pub cache_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailButtonView {
    pub command_id: CommandId,
    pub cache_id: String,
    pub item_id: String,
}

fn is_cache_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn is_value_char(c: char) -> bool {
    c.is_ascii_graphic() && c != COMPACT_DELIMITER && c != LEGACY_SEPARATOR
}

/// Whether `value` can travel as a token value without escaping.
pub fn is_token_value(value: &str) -> bool {
    value.chars().all(is_value_char)
}
