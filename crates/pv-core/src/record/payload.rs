//! Kind-specific payloads carried by event records

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::DeckId;
use crate::screen::ScreenConfiguration;

/// Classification of the deck a slide-state update refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeckType {
    Presentation,
    Whiteboard,
    StudentSubmission,
    QuickPoll,
    #[default]
    Undefined,
}

/// Reference from a submission or poll slide back to a presentation slide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideAssociation {
    pub deck: DeckId,
    pub slide: u32,
    #[serde(default)]
    pub deck_type: DeckType,
}

/// Full navigation state published whenever the presenter changes slides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideState {
    #[serde(default)]
    pub deck_type: DeckType,
    #[serde(default)]
    pub association: Option<SlideAssociation>,
    /// Scale factor of the slide in the display area, in (0, 1]
    #[serde(default = "SlideState::default_slide_size")]
    pub slide_size: f64,
    /// RGBA
    #[serde(default = "SlideState::default_background")]
    pub background: [u8; 4],
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub extension: String,
    #[serde(default)]
    pub scroll_position: f64,
    #[serde(default)]
    pub scroll_extent: f64,
}

impl SlideState {
    fn default_slide_size() -> f64 {
        1.0
    }

    fn default_background() -> [u8; 4] {
        [245, 222, 179, 255]
    }

    /// Resolve the image location for a slide of this deck
    pub fn image_url(&self, slide: u32) -> Option<String> {
        if self.base_url.is_empty() || self.extension.is_empty() {
            return None;
        }
        Some(format!("{}slide{}.{}", self.base_url, slide + 1, self.extension))
    }
}

impl Default for SlideState {
    fn default() -> Self {
        Self {
            deck_type: DeckType::Undefined,
            association: None,
            slide_size: Self::default_slide_size(),
            background: Self::default_background(),
            base_url: String::new(),
            extension: String::new(),
            scroll_position: 0.0,
            scroll_extent: 0.0,
        }
    }
}

/// One ink stroke, possibly still being drawn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeDraw {
    pub stroke_id: Uuid,
    /// `false` while the pen is still down
    pub finished: bool,
    #[serde(default)]
    pub points: Vec<[f32; 2]>,
    #[serde(default)]
    pub color: [u8; 4],
    #[serde(default)]
    pub width: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrollUpdate {
    pub position: f64,
    pub extent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnnotation {
    pub annotation_id: Uuid,
    pub origin: [i32; 2],
    pub text: String,
    #[serde(default)]
    pub color: [u8; 4],
    #[serde(default)]
    pub font: Option<String>,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAnnotation {
    pub annotation_id: Uuid,
    pub origin: [i32; 2],
    pub width: u32,
    pub height: u32,
    /// Encoded image bytes, passed through to the display layer
    #[serde(default)]
    pub image: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickPollStyle {
    #[default]
    YesNo,
    YesNoBoth,
    YesNoNeither,
    Ab,
    Abc,
    Abcd,
    Abcde,
    Abcdef,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickPoll {
    #[serde(default)]
    pub style: QuickPollStyle,
    pub results: Vec<i32>,
}

/// Closed set of update kinds found in a presentation log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    StrokeDraw(StrokeDraw),
    StrokeDelete { stroke_id: Uuid },
    ScrollUpdate(ScrollUpdate),
    /// Erase all ink on one slide
    ClearSlide,
    /// Erase all ink on every slide of a deck
    ClearDeck,
    SlideStateUpdate(SlideState),
    /// Slide change from single-deck recordings, carrying only the index
    SlideIndex,
    ScreenConfig(ScreenConfiguration),
    TextAnnotationAdd(TextAnnotation),
    TextAnnotationDelete { annotation_id: Uuid },
    QuickPollUpdate(QuickPoll),
    ImageAnnotationAdd(ImageAnnotation),
    /// Delete of a text or image annotation
    AnnotationDelete { annotation_id: Uuid },
}

impl EventKind {
    /// Short name used in log output
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::StrokeDraw(_) => "stroke_draw",
            EventKind::StrokeDelete { .. } => "stroke_delete",
            EventKind::ScrollUpdate(_) => "scroll_update",
            EventKind::ClearSlide => "clear_slide",
            EventKind::ClearDeck => "clear_deck",
            EventKind::SlideStateUpdate(_) => "slide_state_update",
            EventKind::SlideIndex => "slide_index",
            EventKind::ScreenConfig(_) => "screen_config",
            EventKind::TextAnnotationAdd(_) => "text_annotation_add",
            EventKind::TextAnnotationDelete { .. } => "text_annotation_delete",
            EventKind::QuickPollUpdate(_) => "quick_poll_update",
            EventKind::ImageAnnotationAdd(_) => "image_annotation_add",
            EventKind::AnnotationDelete { .. } => "annotation_delete",
        }
    }

    /// Kinds that never apply to a single slide
    pub fn is_deck_wide(&self) -> bool {
        matches!(self, EventKind::ClearDeck | EventKind::ScreenConfig(_))
    }

    /// Navigation kinds, answered by the active-slide and screen queries
    /// rather than replayed
    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            EventKind::SlideStateUpdate(_) | EventKind::SlideIndex | EventKind::ScreenConfig(_)
        )
    }
}
