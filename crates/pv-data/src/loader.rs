//! Script loading
//!
//! [`ScriptLoader`] turns a stream of script items into a [`Presentation`].
//! [`load_into`] runs a loader against a session and publishes the result;
//! [`spawn_load`] and [`spawn_load_async`] do the same off the caller's
//! thread.
//!
//! Bad items cost only themselves. A fatal source error ends the load, and
//! the session keeps running without preloaded data.

use pv_core::{
    ActiveSlide, DeckId, EventKind, EventLogBuilder, EventRecord, ImageSourceOverride, Notification, Notifier,
    Presentation, PresenterSession, SlideScope, SlideTitles,
};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{LoadOptions, ViewerVersion};
use crate::decode::{decode_command, decode_packet, FragmentAssembler};
use crate::script::{ScriptItem, ScriptType};
use crate::sources::ScriptSource;
use crate::time::ScriptClock;
use crate::{DataError, DataResult};

/// Summary of a finished load
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Records in the published log
    pub records: usize,
    /// Items and packets dropped as malformed
    pub skipped: usize,
    pub titles: usize,
    /// TOC construction was suppressed
    pub no_auto_toc: bool,
    /// Viewer version the script asks for, if any
    pub preferred_viewer_version: Option<ViewerVersion>,
    /// False when the source failed and nothing was published
    pub loaded: bool,
}

/// Decodes one script into a presentation
pub struct ScriptLoader {
    options: LoadOptions,
    notifier: Option<Notifier>,
    clock: ScriptClock,
    assembler: FragmentAssembler,
    builder: EventLogBuilder,
    titles: SlideTitles,
    script_images: ImageSourceOverride,
    no_auto_toc: bool,
    preferred_viewer_version: Option<ViewerVersion>,
    skipped: usize,
    initial_sent: bool,
    last_progress: u8,
}

impl ScriptLoader {
    pub fn new(options: LoadOptions) -> Self {
        Self {
            options,
            notifier: None,
            clock: ScriptClock::new(),
            assembler: FragmentAssembler::new(),
            builder: EventLogBuilder::new(),
            titles: SlideTitles::new(),
            script_images: ImageSourceOverride::default(),
            no_auto_toc: false,
            preferred_viewer_version: None,
            skipped: 0,
            initial_sent: false,
            last_progress: 0,
        }
    }

    /// Send progress and initial-slide notifications while loading
    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Read `source` to the end
    pub fn run(mut self, source: &mut dyn ScriptSource) -> DataResult<(Presentation, LoadReport)> {
        info!("Loading script from {}", source.name());

        loop {
            let item = match source.next_item() {
                Ok(Some(item)) => item,
                Ok(None) => break,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("Skipping script item: {}", e);
                    self.skipped += 1;
                    continue;
                }
            };

            if let Err(e) = self.handle_item(item) {
                warn!("Skipping script item: {}", e);
                self.skipped += 1;
            }
            self.report_progress(source);
        }

        if self.assembler.finish() {
            self.skipped += 1;
        }
        if self.last_progress < 100 {
            self.notify(Notification::LoadProgress(100));
        }

        let images = self.image_override();
        let log = self.builder.finalize(&images);
        let no_auto_toc = self.options.no_auto_toc || self.no_auto_toc;

        let report = LoadReport {
            records: log.len(),
            skipped: self.skipped,
            titles: self.titles.len(),
            no_auto_toc,
            preferred_viewer_version: self.preferred_viewer_version,
            loaded: true,
        };
        info!(
            "Loaded {} records from {} ({} skipped, {} titles)",
            report.records,
            source.name(),
            report.skipped,
            report.titles
        );

        let mut presentation = Presentation::new(log, self.titles);
        presentation.auto_toc = !no_auto_toc;
        Ok((presentation, report))
    }

    fn handle_item(&mut self, item: ScriptItem) -> DataResult<()> {
        match item {
            ScriptItem::Slides { base_url, extension } => {
                self.script_images = ImageSourceOverride { base_url, extension };
            }
            ScriptItem::Options {
                no_auto_toc,
                preferred_viewer_version,
            } => {
                self.no_auto_toc |= no_auto_toc;
                if let Some(version) = preferred_viewer_version {
                    match version.parse::<ViewerVersion>() {
                        Ok(version) => self.preferred_viewer_version = Some(version),
                        Err(e) => warn!("Ignoring preferred viewer version: {}", e),
                    }
                }
            }
            ScriptItem::Title { deck, index, text } => {
                let deck = Uuid::parse_str(deck.trim()).map_err(|_| DataError::InvalidDeckId(deck.clone()))?;
                let slide =
                    u32::try_from(index).map_err(|_| DataError::MalformedPayload(format!("slide index {}", index)))?;
                self.titles.insert(DeckId(deck), slide, text);
            }
            ScriptItem::ScriptOffset { start, delta } => {
                self.clock.set_offset(&start, delta.as_deref())?;
                debug!("Script offset set to {:?}", self.clock.origin());
            }
            ScriptItem::Script {
                script_type,
                time,
                command,
            } => {
                let Some(script_type) = ScriptType::parse(&script_type) else {
                    debug!("Ignoring script item of type {}", script_type);
                    return Ok(());
                };
                let time = self.clock.relative(&time)?;
                let bytes = decode_command(&command)?;
                if let Some((time, bytes)) = self.assembler.push(script_type, time, bytes) {
                    let record = decode_packet(&bytes)?.into_record(time);
                    self.check_initial_slide(&record);
                    self.builder.push(record);
                }
            }
        }
        Ok(())
    }

    /// Options win over the script's own `slides` item
    fn image_override(&self) -> ImageSourceOverride {
        ImageSourceOverride {
            base_url: self.options.base_url.clone().or_else(|| self.script_images.base_url.clone()),
            extension: self.options.extension.clone().or_else(|| self.script_images.extension.clone()),
        }
    }

    fn check_initial_slide(&mut self, record: &EventRecord) {
        if self.initial_sent || record.timestamp().is_negative() {
            return;
        }

        let images = self.image_override();
        let slide = match (record.kind(), record.scope()) {
            (EventKind::SlideStateUpdate(_), _) => {
                let record = record
                    .clone()
                    .with_image_source(images.base_url.as_deref(), images.extension.as_deref());
                ActiveSlide::State(Arc::new(record))
            }
            (EventKind::SlideIndex, SlideScope::Slide(index))
                if images.base_url.is_some() && images.extension.is_some() =>
            {
                ActiveSlide::Legacy(index)
            }
            _ => return,
        };

        self.initial_sent = true;
        self.notify(Notification::InitialSlide(slide));
    }

    fn report_progress(&mut self, source: &dyn ScriptSource) {
        let Some(total) = source.total_units().filter(|t| *t > 0) else {
            return;
        };
        let step = self.options.progress_step.clamp(1, 100);
        let percent = (source.consumed_units().saturating_mul(100) / total).min(100) as u8;
        let threshold = percent / step * step;
        if threshold > self.last_progress {
            self.last_progress = threshold;
            self.notify(Notification::LoadProgress(threshold));
        }
    }

    fn notify(&self, notification: Notification) {
        if let Some(notifier) = &self.notifier {
            notifier.send(notification);
        }
    }
}

/// Load `source` and publish it into `session`.
///
/// `LoadComplete` is sent whatever the outcome. On a fatal error nothing is
/// published.
pub fn load_into(
    session: &PresenterSession,
    source: &mut dyn ScriptSource,
    options: LoadOptions,
) -> DataResult<LoadReport> {
    let notifier = session.notifier();
    match ScriptLoader::new(options).with_notifier(notifier.clone()).run(source) {
        Ok((presentation, report)) => {
            session.publish(presentation);
            notifier.send(Notification::LoadComplete {
                loaded: true,
                records: report.records,
            });
            Ok(report)
        }
        Err(e) => Err(load_failed(session, e)),
    }
}

fn load_failed(session: &PresenterSession, e: DataError) -> DataError {
    error!("Script load failed, continuing without presentation data: {}", e);
    session.notifier().send(Notification::LoadComplete {
        loaded: false,
        records: 0,
    });
    e
}

fn open_and_load<F>(session: &PresenterSession, options: LoadOptions, open: F) -> DataResult<LoadReport>
where
    F: FnOnce() -> DataResult<Box<dyn ScriptSource>>,
{
    match open() {
        Ok(mut source) => load_into(session, source.as_mut(), options),
        Err(e) => Err(load_failed(session, e)),
    }
}

/// Open and load a script on a dedicated thread
pub fn spawn_load<F>(
    session: Arc<PresenterSession>,
    options: LoadOptions,
    open: F,
) -> std::io::Result<JoinHandle<DataResult<LoadReport>>>
where
    F: FnOnce() -> DataResult<Box<dyn ScriptSource>> + Send + 'static,
{
    thread::Builder::new()
        .name("pv-loader".to_string())
        .spawn(move || open_and_load(&session, options, open))
}

/// Open and load a script on the tokio blocking pool
pub async fn spawn_load_async<F>(
    session: Arc<PresenterSession>,
    options: LoadOptions,
    open: F,
) -> DataResult<LoadReport>
where
    F: FnOnce() -> DataResult<Box<dyn ScriptSource>> + Send + 'static,
{
    tokio::task::spawn_blocking(move || open_and_load(&session, options, open)).await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{encode_fragments, encode_packet, WirePacket};
    use crate::script::ScriptTime;
    use crate::sources::{JsonlSource, VecSource};
    use crossbeam::channel::Receiver;
    use pv_core::record::{SlideState, StrokeDraw};
    use pv_core::{DeckType, DisplaySink, EngineConfig, MediaTime};
    use std::io::Cursor;
    use std::time::Duration;

    struct NullSink;

    impl DisplaySink for NullSink {
        fn apply(&self, _record: &EventRecord) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn session() -> (Arc<PresenterSession>, Receiver<Notification>) {
        let (session, notifications) = PresenterSession::new(EngineConfig::default(), Arc::new(NullSink)).unwrap();
        (Arc::new(session), notifications)
    }

    fn drain(notifications: &Receiver<Notification>) -> Vec<Notification> {
        notifications.try_iter().collect()
    }

    fn deck() -> Uuid {
        Uuid::from_u128(0x5eed)
    }

    fn slide_packet(slide: u32) -> WirePacket {
        WirePacket {
            deck: Some(deck()),
            slide: Some(slide),
            event: EventKind::SlideStateUpdate(SlideState {
                deck_type: DeckType::Presentation,
                base_url: "http://recorded/".into(),
                extension: "png".into(),
                ..SlideState::default()
            }),
        }
    }

    fn stroke_packet(slide: u32) -> WirePacket {
        WirePacket {
            deck: Some(deck()),
            slide: Some(slide),
            event: EventKind::StrokeDraw(StrokeDraw {
                stroke_id: Uuid::new_v4(),
                finished: true,
                points: (0..40).map(|i| [i as f32, 2.0 * i as f32]).collect(),
                color: [255, 0, 0, 255],
                width: 2.0,
            }),
        }
    }

    fn script(script_type: &str, secs: f64, command: String) -> ScriptItem {
        ScriptItem::Script {
            script_type: script_type.into(),
            time: ScriptTime::Seconds(secs),
            command,
        }
    }

    fn whole(secs: f64, packet: &WirePacket) -> ScriptItem {
        script("CXP0", secs, encode_packet(packet).unwrap())
    }

    #[test]
    fn test_load_with_fragments_and_titles() {
        let stroke = stroke_packet(0);
        let pieces = encode_fragments(&stroke, 3).unwrap();
        let last = pieces.len() - 1;

        let mut items = vec![
            ScriptItem::Slides {
                base_url: Some("http://script/".into()),
                extension: Some("jpg".into()),
            },
            ScriptItem::Title {
                deck: deck().to_string(),
                index: 0,
                text: "Welcome".into(),
            },
            whole(0.0, &slide_packet(0)),
        ];
        for (i, piece) in pieces.into_iter().enumerate() {
            let code = if i == last { "CXP0" } else { "CXP1" };
            items.push(script(code, 5.0 + i as f64, piece));
        }
        items.push(script("CXP2", 9.0, "ignored".into()));
        items.push(whole(20.0, &slide_packet(1)));

        let (session, notifications) = session();
        let mut source = VecSource::new("inline", items);
        let report = load_into(&session, &mut source, LoadOptions::default()).unwrap();

        assert!(report.loaded);
        assert_eq!(report.records, 3);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.titles, 1);

        let timeline = session.timeline().expect("published");
        let log = timeline.log();
        assert_eq!(log.get(1).unwrap().timestamp(), MediaTime::from_secs_f64(5.0));
        assert_eq!(log.get(1).unwrap().kind(), &stroke.event);

        // the script's image location replaces the recorded one
        let state = log.get(2).unwrap().slide_state().unwrap();
        assert_eq!(state.base_url, "http://script/");
        assert_eq!(state.extension, "jpg");

        let toc = timeline.toc().expect("toc built");
        assert!(toc.entries()[0].text().contains("Welcome"));

        let notes = drain(&notifications);
        assert!(matches!(
            notes.last(),
            Some(Notification::LoadComplete { loaded: true, records: 3 })
        ));
    }

    #[test]
    fn test_malformed_items_are_skipped() {
        let items = vec![
            whole(1.0, &slide_packet(0)),
            script("CXP0", 2.0, "!!not base64!!".into()),
            script("CXP0", 3.0, encode_packet(&slide_packet(1)).unwrap()[..12].to_string()),
            script("CXP0", f64::NAN, encode_packet(&slide_packet(1)).unwrap()),
            ScriptItem::Script {
                script_type: "CXP0".into(),
                time: ScriptTime::Stamp("3/14/2005 1:00:00 PM".into()),
                command: encode_packet(&slide_packet(1)).unwrap(),
            },
            ScriptItem::Title {
                deck: "not-a-uuid".into(),
                index: 0,
                text: "Lost".into(),
            },
            ScriptItem::Title {
                deck: deck().to_string(),
                index: -1,
                text: "Lost".into(),
            },
            whole(4.0, &stroke_packet(0)),
        ];

        let (session, _notifications) = session();
        let mut source = VecSource::new("inline", items);
        let report = load_into(&session, &mut source, LoadOptions::default()).unwrap();

        assert_eq!(report.records, 2);
        assert_eq!(report.skipped, 6);
        assert_eq!(report.titles, 0);
    }

    #[test]
    fn test_bad_lines_and_offsets_from_jsonl() {
        let early = encode_packet(&slide_packet(0)).unwrap();
        let late = encode_packet(&slide_packet(1)).unwrap();
        let text = format!(
            concat!(
                r#"{{"element":"script_offset","start":"3/14/2005 1:00:00 PM","delta":"00:00:10"}}"#,
                "\n",
                r#"{{"element":"script","type":"CXP0","time":"3/14/2005 1:00:05 PM","command":"{}"}}"#,
                "\n",
                "this is not json\n",
                r#"{{"element":"script","type":"CXP0","time":"3/14/2005 1:00:40 PM","command":"{}"}}"#,
                "\n"
            ),
            early, late
        );

        let (session, _notifications) = session();
        let total = text.len() as u64;
        let mut source = JsonlSource::from_reader("inline", Cursor::new(text.into_bytes()), Some(total));
        let report = load_into(&session, &mut source, LoadOptions::default()).unwrap();

        // the record before the offset is dropped at finalisation
        assert_eq!(report.records, 1);
        assert_eq!(report.skipped, 1);
        let timeline = session.timeline().unwrap();
        assert_eq!(timeline.log().get(0).unwrap().timestamp(), MediaTime::from_secs_f64(30.0));
    }

    #[test]
    fn test_unreachable_offset_is_skipped() {
        let items = vec![
            ScriptItem::ScriptOffset {
                start: "3/14/2005 1:00:00 PM".into(),
                delta: Some("99999999.00:00:00".into()),
            },
            whole(1.0, &slide_packet(0)),
            whole(2.0, &stroke_packet(0)),
        ];

        let (session, notifications) = session();
        let report = load_into(&session, &mut VecSource::new("inline", items), LoadOptions::default()).unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.records, 2);
        assert!(drain(&notifications)
            .iter()
            .any(|n| matches!(n, Notification::LoadComplete { loaded: true, records: 2 })));
    }

    #[test]
    fn test_progress_in_steps() {
        let items: Vec<ScriptItem> = (0..20).map(|i| whole(i as f64, &stroke_packet(0))).collect();
        let (session, notifications) = session();
        let mut source = VecSource::new("inline", items);
        load_into(&session, &mut source, LoadOptions::default()).unwrap();

        let progress: Vec<u8> = drain(&notifications)
            .into_iter()
            .filter_map(|n| match n {
                Notification::LoadProgress(p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100]);
    }

    #[test]
    fn test_no_auto_toc_and_viewer_version() {
        let items = vec![
            ScriptItem::Options {
                no_auto_toc: true,
                preferred_viewer_version: Some("1.9.4".into()),
            },
            whole(0.0, &slide_packet(0)),
            whole(30.0, &slide_packet(1)),
        ];
        let (session, _notifications) = session();
        let mut source = VecSource::new("inline", items);
        let report = load_into(&session, &mut source, LoadOptions::default()).unwrap();

        assert!(report.no_auto_toc);
        assert_eq!(report.preferred_viewer_version, Some("1.9.4".parse().unwrap()));
        assert!(session.timeline().unwrap().toc().is_none());
        assert!(session.toc_entry(0).is_none());
    }

    #[test]
    fn test_options_override_script_images() {
        let items = vec![
            ScriptItem::Slides {
                base_url: Some("http://script/".into()),
                extension: Some("jpg".into()),
            },
            whole(0.0, &slide_packet(0)),
        ];
        let options = LoadOptions {
            base_url: Some("http://local/".into()),
            ..LoadOptions::default()
        };
        let (session, notifications) = session();
        let mut source = VecSource::new("inline", items);
        load_into(&session, &mut source, options).unwrap();

        let state = session.timeline().unwrap().log().get(0).unwrap().slide_state().unwrap().clone();
        assert_eq!(state.base_url, "http://local/");
        assert_eq!(state.extension, "jpg");

        match drain(&notifications).first() {
            Some(Notification::InitialSlide(ActiveSlide::State(record))) => {
                assert_eq!(record.slide_state().unwrap().base_url, "http://local/");
            }
            other => panic!("expected initial slide, got {:?}", other),
        }
    }

    #[test]
    fn test_initial_slide_sent_once() {
        let legacy = |slide| WirePacket {
            deck: None,
            slide: Some(slide),
            event: EventKind::SlideIndex,
        };

        // legacy slide changes need a known image location
        let items = vec![whole(0.0, &legacy(0)), whole(1.0, &legacy(1))];
        let (unplaced, notifications) = session();
        load_into(&unplaced, &mut VecSource::new("a", items), LoadOptions::default()).unwrap();
        assert!(!drain(&notifications)
            .iter()
            .any(|n| matches!(n, Notification::InitialSlide(_))));

        let items = vec![
            ScriptItem::Slides {
                base_url: Some("http://script/".into()),
                extension: Some("jpg".into()),
            },
            whole(0.0, &legacy(2)),
            whole(1.0, &legacy(3)),
        ];
        let (placed, notifications) = session();
        load_into(&placed, &mut VecSource::new("b", items), LoadOptions::default()).unwrap();
        let initial: Vec<_> = drain(&notifications)
            .into_iter()
            .filter_map(|n| match n {
                Notification::InitialSlide(slide) => Some(slide),
                _ => None,
            })
            .collect();
        assert_eq!(initial.len(), 1);
        assert!(matches!(initial[0], ActiveSlide::Legacy(2)));
    }

    #[test]
    fn test_failed_source_leaves_session_unloaded() {
        let (session, notifications) = session();
        let handle = spawn_load(session.clone(), LoadOptions::default(), || {
            Ok(Box::new(JsonlSource::open("/no/such/script.jsonl")?) as Box<dyn ScriptSource>)
        })
        .unwrap();

        let result = handle.join().unwrap();
        assert!(result.unwrap_err().is_fatal());
        assert!(!session.is_loaded());
        assert!(matches!(
            notifications.recv_timeout(Duration::from_secs(1)),
            Ok(Notification::LoadComplete { loaded: false, records: 0 })
        ));
    }

    #[tokio::test]
    async fn test_async_load() {
        let (session, _notifications) = session();
        let items = vec![whole(0.0, &slide_packet(0)), whole(4.0, &stroke_packet(0))];
        let report = spawn_load_async(session.clone(), LoadOptions::default(), move || {
            Ok(Box::new(VecSource::new("async", items)) as Box<dyn ScriptSource>)
        })
        .await
        .unwrap();

        assert_eq!(report.records, 2);
        assert!(session.is_loaded());
    }
}
