//! Ministry category inference
//!
//! Categories are tried in table order and the first one with a keyword hit
//! wins. Keywords match whole words (or whole phrases) of the normalised
//! title plus description, so "men" does not fire on "women".

use serde::{Deserialize, Serialize};

use crate::impl_label_conversions;
use crate::utils::title::normalize_title;

/// Ministry category inferred from an event's text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MinistryTag {
    Children,
    Youth,
    Worship,
    Prayer,
    BibleStudy,
    Fellowship,
    Missions,
    Seniors,
    Men,
    Women,
    YoungAdults,
    Family,
    Discipleship,
    Evangelism,
    PastoralCare,
}

impl_label_conversions!(MinistryTag {
    Children => "children",
    Youth => "youth",
    Worship => "worship",
    Prayer => "prayer",
    BibleStudy => "bible-study",
    Fellowship => "fellowship",
    Missions => "missions",
    Seniors => "seniors",
    Men => "men",
    Women => "women",
    YoungAdults => "young-adults",
    Family => "family",
    Discipleship => "discipleship",
    Evangelism => "evangelism",
    PastoralCare => "pastoral-care",
});

/// One row of the keyword table
#[derive(Debug, Clone, Copy)]
pub struct MinistryKeywords {
    pub tag: MinistryTag,
    /// Already normalised (see [`normalize_title`]).
    pub keywords: &'static [&'static str],
}

/// Category priority order. Earlier rows win.
pub const MINISTRY_KEYWORDS: &[MinistryKeywords] = &[
    MinistryKeywords {
        tag: MinistryTag::Children,
        keywords: &[
            "children",
            "childrens",
            "kids",
            "nursery",
            "sunday school",
            "vbs",
            "preschool",
        ],
    },
    MinistryKeywords {
        tag: MinistryTag::Youth,
        keywords: &["youth", "teen", "teens", "student ministry", "middle school", "high school"],
    },
    MinistryKeywords {
        tag: MinistryTag::Worship,
        keywords: &["worship", "service", "choir", "praise", "mass", "liturgy", "communion"],
    },
    MinistryKeywords { tag: MinistryTag::Prayer, keywords: &["prayer", "pray", "intercession", "vigil"] },
    MinistryKeywords {
        tag: MinistryTag::BibleStudy,
        keywords: &["bible study", "bible", "scripture", "study"],
    },
    MinistryKeywords {
        tag: MinistryTag::Fellowship,
        keywords: &["fellowship", "potluck", "coffee", "social", "dinner", "breakfast"],
    },
    MinistryKeywords {
        tag: MinistryTag::Missions,
        keywords: &["mission", "missions", "outreach", "food pantry", "volunteer"],
    },
    MinistryKeywords { tag: MinistryTag::Seniors, keywords: &["senior", "seniors", "elderly", "golden"] },
    MinistryKeywords { tag: MinistryTag::Men, keywords: &["men", "mens", "brotherhood"] },
    MinistryKeywords { tag: MinistryTag::Women, keywords: &["women", "womens", "ladies", "sisterhood"] },
    MinistryKeywords {
        tag: MinistryTag::YoungAdults,
        keywords: &["young adult", "young adults", "college", "twenties"],
    },
    MinistryKeywords {
        tag: MinistryTag::Family,
        keywords: &["family", "families", "parenting", "marriage", "couples"],
    },
    MinistryKeywords {
        tag: MinistryTag::Discipleship,
        keywords: &["discipleship", "disciple", "membership class", "mentoring", "growth"],
    },
    MinistryKeywords {
        tag: MinistryTag::Evangelism,
        keywords: &["evangelism", "alpha", "seekers", "newcomers"],
    },
    MinistryKeywords {
        tag: MinistryTag::PastoralCare,
        keywords: &["grief", "counseling", "care", "support group", "recovery", "visitation"],
    },
];

/// Infer a ministry tag from an event's title and description.
///
/// ```
/// use steeple_domain::utils::ministry::{infer_ministry_tag, MinistryTag};
///
/// assert_eq!(infer_ministry_tag("Youth Group", None), Some(MinistryTag::Youth));
/// assert_eq!(infer_ministry_tag("Board Meeting", None), None);
/// ```
#[must_use]
pub fn infer_ministry_tag(title: &str, description: Option<&str>) -> Option<MinistryTag> {
    infer_with_table(MINISTRY_KEYWORDS, title, description)
}

/// Same as [`infer_ministry_tag`] against a caller-supplied table.
#[must_use]
pub fn infer_with_table(
    table: &[MinistryKeywords],
    title: &str,
    description: Option<&str>,
) -> Option<MinistryTag> {
    let text = format!(" {} {} ", normalize_title(title), normalize_title(description.unwrap_or("")));
    table
        .iter()
        .find(|row| row.keywords.iter().any(|keyword| text.contains(&format!(" {keyword} "))))
        .map(|row| row.tag)
}
