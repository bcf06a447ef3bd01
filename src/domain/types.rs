//! Closed tag enumerations carried inside navigation tokens.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Feature domain selected by the first character of a command id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Game,
    Brand,
    Music,
    Creator,
    Character,
}

impl Domain {
    pub const ALL: [Domain; 5] = [
        Domain::Game,
        Domain::Brand,
        Domain::Music,
        Domain::Creator,
        Domain::Character,
    ];

    pub fn tag(self) -> char {
        match self {
            Domain::Game => 'G',
            Domain::Brand => 'B',
            Domain::Music => 'M',
            Domain::Creator => 'C',
            Domain::Character => 'H',
        }
    }

    pub fn from_tag(tag: char) -> Option<Self> {
        match tag {
            'G' => Some(Domain::Game),
            'B' => Some(Domain::Brand),
            'M' => Some(Domain::Music),
            'C' => Some(Domain::Creator),
            'H' => Some(Domain::Character),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Game => "game",
            Domain::Brand => "brand",
            Domain::Music => "music",
            Domain::Creator => "creator",
            Domain::Character => "character",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// UI behavior a token was minted for.
///
/// The behavior decides which navigation flow runs and how the token's
/// value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Behavior {
    /// Value is a 1-based page number.
    Page,
    /// Value is the stable id of the selected item.
    SelectMenu,
    /// Value is ignored.
    BackToHome,
    /// Value is the id of an item to open.
    DetailButton,
}

impl Behavior {
    pub fn tag(self) -> char {
        match self {
            Behavior::Page => 'P',
            Behavior::SelectMenu => 'S',
            Behavior::BackToHome => 'B',
            Behavior::DetailButton => 'D',
        }
    }

    pub fn from_tag(tag: char) -> Option<Self> {
        match tag {
            'P' => Some(Behavior::Page),
            'S' => Some(Behavior::SelectMenu),
            'B' => Some(Behavior::BackToHome),
            'D' => Some(Behavior::DetailButton),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Behavior::Page => "page",
            Behavior::SelectMenu => "select_menu",
            Behavior::BackToHome => "back_to_home",
            Behavior::DetailButton => "detail_button",
        }
    }
}

impl fmt::Display for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
