//! DR icon catalog.
//!
//! The set of diminishing-returns categories and the icons that can stand in
//! for each one. The catalog is fixed at build time: categories and assets are
//! never created at runtime, which is what lets the bitmap cache grow without
//! eviction.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A diminishing-returns category, each backed by exactly one on-disk icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryId {
    Stun,
    Incap,
    Fear,
    Root,
}

/// An alternative icon offered for a category.
#[derive(Debug, Clone, Copy)]
pub struct Alternative {
    /// Asset path relative to the asset directory
    pub asset: &'static str,
    /// Display name (the spell the icon comes from)
    pub name: &'static str,
}

/// Static description of one category.
#[derive(Debug)]
pub struct Category {
    pub id: CategoryId,
    pub name: &'static str,
    pub description: &'static str,
    /// File name the game client loads from `Interface/ICONS`
    pub target_file_name: &'static str,
    /// Asset path of the stock icon
    pub default_asset: &'static str,
    pub alternatives: &'static [Alternative],
    /// Other abilities sharing the same icon file, so they change too
    pub affected_abilities: &'static [&'static str],
}

static CATEGORIES: [Category; 4] = [
    Category {
        id: CategoryId::Stun,
        name: "Stun",
        description: "Stun effects (Hammer of Justice, Kidney Shot, etc.)",
        target_file_name: "Spell_Frost_Stun.tga",
        default_asset: "default-drs/spell_frost_stun.tga",
        alternatives: &[
            Alternative {
                asset: "alternative-stun/ability_rogue_kidneyshot.tga",
                name: "Kidney Shot",
            },
            Alternative {
                asset: "alternative-stun/ability_CheapShot.tga",
                name: "Cheap Shot",
            },
        ],
        affected_abilities: &[
            "Concussive Shot (Hunter)",
            "Concussion Blow",
            "War Stomp",
            "and other stun-related abilities",
        ],
    },
    Category {
        id: CategoryId::Incap,
        name: "Incapacitate",
        description: "Incapacitate effects (Polymorph, Hex, etc.)",
        target_file_name: "Spell_Holy_Dizzy.tga",
        default_asset: "default-drs/spell_holy_dizzy.tga",
        alternatives: &[
            Alternative {
                asset: "alternative-incap/spell_nature_polymorph.tga",
                name: "Polymorph",
            },
            Alternative {
                asset: "alternative-incap/spell_frost_chainsofice.tga",
                name: "Chains of Ice",
            },
        ],
        affected_abilities: &[
            "Repentance",
            "Gouge",
            "Sap",
            "and other incapacitate abilities",
        ],
    },
    Category {
        id: CategoryId::Fear,
        name: "Fear",
        description: "Fear effects (Psychic Scream, Howl of Terror, etc.)",
        target_file_name: "Spell_Nature_AstralRecalGroup.tga",
        default_asset: "default-drs/spell_nature_astralrecalgroup.tga",
        alternatives: &[Alternative {
            asset: "alternative-fear/spell_shadow_possession.tga",
            name: "Possession",
        }],
        affected_abilities: &[
            "Intimidating Shout",
            "Psychic Scream",
            "Howl of Terror",
            "and other fear abilities",
        ],
    },
    Category {
        id: CategoryId::Root,
        name: "Root",
        description: "Root effects (Entangling Roots, Frost Nova, etc.)",
        target_file_name: "Spell_Nature_StrangleVines.tga",
        default_asset: "default-drs/spell_nature_stranglevines.tga",
        alternatives: &[Alternative {
            asset: "alternative-root/spell_frost_frostnova.tga",
            name: "Frost Nova",
        }],
        affected_abilities: &[
            "Entangling Roots",
            "Mass Entanglement",
            "Earthbind Totem",
            "and other root abilities",
        ],
    },
];

/// All categories in display order.
pub fn categories() -> &'static [Category] {
    &CATEGORIES
}

impl CategoryId {
    pub const ALL: [CategoryId; 4] = [
        CategoryId::Stun,
        CategoryId::Incap,
        CategoryId::Fear,
        CategoryId::Root,
    ];

    /// Returns the static description for this category.
    pub fn info(self) -> &'static Category {
        match self {
            CategoryId::Stun => &CATEGORIES[0],
            CategoryId::Incap => &CATEGORIES[1],
            CategoryId::Fear => &CATEGORIES[2],
            CategoryId::Root => &CATEGORIES[3],
        }
    }

    /// Returns the key used in settings files and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            CategoryId::Stun => "stun",
            CategoryId::Incap => "incap",
            CategoryId::Fear => "fear",
            CategoryId::Root => "root",
        }
    }

    /// Parses a category key (case-insensitive).
    pub fn parse(key: &str) -> Option<Self> {
        match key.to_lowercase().as_str() {
            "stun" => Some(CategoryId::Stun),
            "incap" | "incapacitate" => Some(CategoryId::Incap),
            "fear" => Some(CategoryId::Fear),
            "root" => Some(CategoryId::Root),
            _ => None,
        }
    }

    /// The stock icon for this category.
    pub fn default_icon(self) -> IconRef {
        IconRef {
            category: self,
            asset: self.info().default_asset,
        }
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A specific icon asset: a category's default or one of its alternatives.
///
/// Two refs are equal when they point at the same asset.
#[derive(Debug, Clone, Copy)]
pub struct IconRef {
    category: CategoryId,
    asset: &'static str,
}

impl IconRef {
    /// The `index`-th alternative (1-based, matching `alt1`, `alt2` on the CLI).
    pub fn alternative(category: CategoryId, index: usize) -> Option<Self> {
        let alt = category.info().alternatives.get(index.checked_sub(1)?)?;
        Some(Self {
            category,
            asset: alt.asset,
        })
    }

    /// Looks up an icon by its asset path within any category.
    pub fn from_asset(asset: &str) -> Option<Self> {
        categories().iter().find_map(|cat| {
            if cat.default_asset.eq_ignore_ascii_case(asset) {
                return Some(cat.id.default_icon());
            }
            cat.alternatives
                .iter()
                .find(|alt| alt.asset.eq_ignore_ascii_case(asset))
                .map(|alt| Self {
                    category: cat.id,
                    asset: alt.asset,
                })
        })
    }

    /// Parses a user-facing icon name for `category`.
    ///
    /// Accepts `default`, `altN`, an alternative's display name, or an asset path.
    pub fn parse(category: CategoryId, name: &str) -> Option<Self> {
        let lower = name.trim().to_lowercase();
        if lower == "default" {
            return Some(category.default_icon());
        }
        if let Some(index) = lower.strip_prefix("alt").and_then(|n| n.parse().ok()) {
            return Self::alternative(category, index);
        }
        if let Some(alt) = category
            .info()
            .alternatives
            .iter()
            .find(|alt| alt.name.eq_ignore_ascii_case(name.trim()))
        {
            return Some(Self {
                category,
                asset: alt.asset,
            });
        }
        Self::from_asset(name.trim()).filter(|icon| icon.category == category)
    }

    pub fn category(&self) -> CategoryId {
        self.category
    }

    /// Asset path, also the icon's source identity in the bitmap cache.
    pub fn asset(&self) -> &'static str {
        self.asset
    }

    pub fn is_default(&self) -> bool {
        *self == self.category.default_icon()
    }

    /// Display name: the alternative's spell name, or `Default`.
    pub fn display_name(&self) -> &'static str {
        self.category
            .info()
            .alternatives
            .iter()
            .find(|alt| alt.asset == self.asset)
            .map(|alt| alt.name)
            .unwrap_or("Default")
    }
}

impl PartialEq for IconRef {
    fn eq(&self, other: &Self) -> bool {
        self.asset == other.asset
    }
}

impl Eq for IconRef {}

impl Hash for IconRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.asset.hash(state);
    }
}

impl fmt::Display for IconRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.asset)
    }
}

/// Formats a version directory name for display.
/// `_retail_` -> `Retail`, `_classic_era_` -> `Classicera`
pub fn version_display_name(version: &str) -> String {
    let stripped: String = version.chars().filter(|c| *c != '_').collect();
    let mut chars = stripped.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
