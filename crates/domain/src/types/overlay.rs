//! Human-curated metadata layered on top of computed patterns

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::event::RawEvent;
use crate::types::partition::Partition;
use crate::types::pattern::PatternSource;

/// Curated fields on a pattern. The analyzer never sets these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatternOverlay {
    pub ministry_link_id: Option<i64>,
    pub special_event_type_id: Option<i64>,
    pub is_special_event: bool,
    /// Hidden from public listings entirely
    pub is_external: bool,
    pub featured_on_home_page: bool,
    pub note: Option<String>,
    pub image: Option<String>,
    pub contact_person: Option<String>,
    pub recurring_description_override: Option<String>,
    pub ends_by_date: Option<NaiveDate>,
}

impl PatternOverlay {
    /// Whether an operator has set anything at all
    #[must_use]
    pub fn is_curated(&self) -> bool {
        *self != Self::default()
    }
}

/// Partial overlay update.
///
/// An absent field leaves the current value alone. For nullable fields an
/// explicit `null` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayPatch {
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub ministry_link_id: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub special_event_type_id: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_special_event: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_external: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured_on_home_page: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub note: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub image: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub contact_person: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub recurring_description_override: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub ends_by_date: Option<Option<NaiveDate>>,
}

impl OverlayPatch {
    /// Ministry id the patch would link to, if any
    #[must_use]
    pub fn ministry_reference(&self) -> Option<i64> {
        self.ministry_link_id.flatten()
    }

    /// Special event type id the patch would link to, if any
    #[must_use]
    pub fn special_event_type_reference(&self) -> Option<i64> {
        self.special_event_type_id.flatten()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge the patch into an overlay in place
    pub fn apply(&self, overlay: &mut PatternOverlay) {
        fn set<T: Clone>(target: &mut T, value: Option<&T>) {
            if let Some(value) = value {
                target.clone_from(value);
            }
        }

        set(&mut overlay.ministry_link_id, self.ministry_link_id.as_ref());
        set(&mut overlay.special_event_type_id, self.special_event_type_id.as_ref());
        set(&mut overlay.is_special_event, self.is_special_event.as_ref());
        set(&mut overlay.is_external, self.is_external.as_ref());
        set(&mut overlay.featured_on_home_page, self.featured_on_home_page.as_ref());
        set(&mut overlay.note, self.note.as_ref());
        set(&mut overlay.image, self.image.as_ref());
        set(&mut overlay.contact_person, self.contact_person.as_ref());
        set(&mut overlay.recurring_description_override, self.recurring_description_override.as_ref());
        set(&mut overlay.ends_by_date, self.ends_by_date.as_ref());
    }

    /// The patch applied to an empty overlay
    #[must_use]
    pub fn to_overlay(&self) -> PatternOverlay {
        let mut overlay = PatternOverlay::default();
        self.apply(&mut overlay);
        overlay
    }
}

/// Curated metadata pinned to one concrete occurrence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceOverride {
    pub external_id: String,
    #[serde(flatten)]
    pub overlay: PatternOverlay,
    pub updated_at: DateTime<Utc>,
}

/// An occurrence together with its override
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceMetadata {
    pub event: RawEvent,
    #[serde(rename = "override")]
    pub instance_override: InstanceOverride,
}

/// A calendar occurrence as served to readers, with its override if one exists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedEvent {
    #[serde(flatten)]
    pub event: RawEvent,
    #[serde(rename = "override", default)]
    pub instance_override: Option<InstanceOverride>,
}

impl AnnotatedEvent {
    /// Pair `event` with the override keyed by its external id
    #[must_use]
    pub fn new(event: RawEvent, instance_override: Option<InstanceOverride>) -> Self {
        Self { event, instance_override }
    }
}

/// Curated data whose pattern disappeared on recompute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanedOverlay {
    pub id: String,
    #[serde(flatten)]
    pub partition: Partition,
    pub title: String,
    pub day_of_week: u8,
    pub time: String,
    pub location: Option<String>,
    pub source: PatternSource,
    #[serde(flatten)]
    pub overlay: PatternOverlay,
    pub orphaned_at: DateTime<Utc>,
}
