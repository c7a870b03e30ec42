use std::collections::BTreeMap;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::assign::assign_devices;
use crate::descriptor::{parse_descriptor, DescriptorSet};
use crate::logger::{PollLogMode, PollLogger};
use crate::pages::PageSet;
use crate::reconcile::{parse_live_document, resolve_entities};
use crate::session::{XccSession, DEFAULT_PASSWORD, DEFAULT_USERNAME};
use crate::types::*;
use crate::{Error, Result};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(120);
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_FETCH_CONCURRENCY: usize = 4;

type EventCallback = Box<dyn Fn(&Event) + Send + Sync>;
type SnapshotCallback = Box<dyn Fn(&Snapshot) + Send + Sync>;

pub struct XccClientBuilder {
    ip: String,
    protocol: String,
    username: String,
    password: String,
    pages: PageSet,
    poll_interval: Duration,
    fetch_timeout: Duration,
    fetch_concurrency: usize,
    event_callbacks: Vec<EventCallback>,
    snapshot_callbacks: Vec<SnapshotCallback>,
    log_mode: Option<PollLogMode>,
    log_path: Option<String>,
}

impl XccClientBuilder {
    pub fn new(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            protocol: "http".to_string(),
            username: DEFAULT_USERNAME.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            pages: PageSet::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            event_callbacks: Vec::new(),
            snapshot_callbacks: Vec::new(),
            log_mode: None,
            log_path: None,
        }
    }

    pub fn protocol(mut self, proto: &str) -> Self {
        self.protocol = proto.to_string();
        self
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn pages(mut self, pages: PageSet) -> Self {
        self.pages = pages;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn fetch_concurrency(mut self, n: usize) -> Self {
        self.fetch_concurrency = n.max(1);
        self
    }

    pub fn on_event(mut self, f: impl Fn(&Event) + Send + Sync + 'static) -> Self {
        self.event_callbacks.push(Box::new(f));
        self
    }

    pub fn on_snapshot(mut self, f: impl Fn(&Snapshot) + Send + Sync + 'static) -> Self {
        self.snapshot_callbacks.push(Box::new(f));
        self
    }

    pub fn poll_log(mut self, mode: PollLogMode, path: impl Into<String>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    pub fn build(self) -> XccClient {
        let session = XccSession::new(
            format!("{}://{}", self.protocol, self.ip),
            self.username,
            self.password,
            self.fetch_timeout,
        )
        .expect("failed to build HTTP client");

        let logger = match (self.log_mode, self.log_path) {
            (Some(mode), Some(path)) => {
                Some(PollLogger::new(mode, &path).expect("failed to open log file"))
            }
            _ => None,
        };

        XccClient {
            session,
            pages: self.pages,
            poll_interval: self.poll_interval,
            fetch_concurrency: self.fetch_concurrency,
            connected: false,
            descriptors: None,
            snapshot: Snapshot::default(),
            cycles: 0,
            event_callbacks: self.event_callbacks,
            snapshot_callbacks: self.snapshot_callbacks,
            logger,
        }
    }
}

/// Polling client for one controller. Descriptors are fetched once and
/// cached; every poll cycle re-fetches the live pages and publishes a
/// fresh snapshot.
pub struct XccClient {
    session: XccSession,
    pages: PageSet,
    poll_interval: Duration,
    fetch_concurrency: usize,
    connected: bool,
    descriptors: Option<DescriptorSet>,
    snapshot: Snapshot,
    cycles: u64,
    event_callbacks: Vec<EventCallback>,
    snapshot_callbacks: Vec<SnapshotCallback>,
    logger: Option<PollLogger>,
}

impl XccClient {
    pub fn builder(ip: impl Into<String>) -> XccClientBuilder {
        XccClientBuilder::new(ip)
    }

    pub async fn connect(&mut self) -> Result<()> {
        debug!(url = %self.session.base_url(), "connecting to controller");
        self.session.connect().await?;
        self.connected = true;
        Ok(())
    }

    /// The last published snapshot, empty before the first cycle.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Run one full cycle: descriptors (cached after the first success),
    /// live pages, reconcile, assign, publish. Fails only when not a
    /// single live page could be fetched.
    pub async fn poll_cycle(&mut self) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        let (descriptors, cacheable) = match self.descriptors.take() {
            Some(set) => (set, true),
            None => self.fetch_descriptor_set().await,
        };

        let live_results = self.fetch_pages(self.pages.live_pages.clone()).await;

        let mut live = LiveSnapshot::default();
        let mut fetched = 0usize;
        for (page, result) in live_results {
            match result {
                Ok(body) => {
                    if let Some(ref mut logger) = self.logger {
                        logger.log_fetch(&page, "ok", body.len());
                    }
                    fetched += 1;
                    for value in parse_live_document(&body, &page) {
                        live.add(value);
                    }
                }
                Err(e) => {
                    warn!(page, error = %e, "live page fetch failed");
                    if let Some(ref mut logger) = self.logger {
                        logger.log_fetch(&page, "error", 0);
                    }
                }
            }
        }

        if fetched == 0 {
            if cacheable {
                self.descriptors = Some(descriptors);
            }
            return Err(Error::CycleFailed);
        }

        let entities = resolve_entities(&descriptors, &live);
        let next = assign_devices(entities);

        let events = if self.cycles > 0 {
            diff_snapshots(&self.snapshot, &next)
        } else {
            Vec::new()
        };

        for event in &events {
            for cb in &self.event_callbacks {
                cb(event);
            }
        }
        for cb in &self.snapshot_callbacks {
            cb(&next);
        }
        if let Some(ref mut logger) = self.logger {
            logger.log_cycle(&next, &events);
        }

        if !events.is_empty() {
            debug!(count = events.len(), "published events");
        }

        self.snapshot = next;
        self.cycles += 1;
        if cacheable {
            self.descriptors = Some(descriptors);
        }
        Ok(())
    }

    /// Poll forever on the configured interval. The first cycle runs
    /// immediately; a failed cycle is logged and the loop keeps going.
    pub async fn run(&mut self) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if let Err(e) = self.poll_cycle().await {
                warn!(error = %e, "poll cycle failed");
            }
        }
    }

    /// Validate and write one property. The target page is the
    /// descriptor page the property's spec came from.
    pub async fn set_value(&mut self, prop: &str, value: &str) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        let Some((_, entity)) = self.snapshot.entity(prop) else {
            return Err(Error::UnknownProp(prop.to_string()));
        };
        let Some(spec) = &entity.spec else {
            return Err(Error::WriteRejected {
                prop: prop.to_string(),
                reason: "no descriptor for this property".to_string(),
            });
        };

        let outgoing = validate_write(spec, value).map_err(|reason| Error::WriteRejected {
            prop: prop.to_string(),
            reason,
        })?;
        let page = spec.source_page.clone();

        let result = self.session.write_value(&page, prop, &outgoing).await;
        if let Some(ref mut logger) = self.logger {
            let status = if result.is_ok() { "ok" } else { "error" };
            logger.log_write(prop, &outgoing, status);
        }
        result
    }

    async fn fetch_descriptor_set(&mut self) -> (DescriptorSet, bool) {
        let results = self.fetch_pages(self.pages.descriptor_pages.clone()).await;

        let mut set = DescriptorSet::default();
        let mut complete = true;
        for (page, result) in results {
            match result {
                Ok(body) => {
                    if let Some(ref mut logger) = self.logger {
                        logger.log_fetch(&page, "ok", body.len());
                    }
                    set.add_page(parse_descriptor(&body, &page));
                }
                Err(Error::PageNotFound(_)) => {
                    // Missing on this firmware, nothing to retry.
                    debug!(page, "descriptor page not present");
                    if let Some(ref mut logger) = self.logger {
                        logger.log_fetch(&page, "not-found", 0);
                    }
                }
                Err(e) => {
                    warn!(page, error = %e, "descriptor page fetch failed, will retry next cycle");
                    if let Some(ref mut logger) = self.logger {
                        logger.log_fetch(&page, "error", 0);
                    }
                    complete = false;
                }
            }
        }
        set.disambiguate_names();
        debug!(specs = set.len(), complete, "descriptor set assembled");
        (set, complete)
    }

    /// Fetch pages with bounded concurrency, results in list order so
    /// first-wins merging stays deterministic.
    async fn fetch_pages(&self, pages: Vec<String>) -> Vec<(String, Result<String>)> {
        let session = &self.session;
        stream::iter(pages)
            .map(|page| async move {
                let body = session.fetch_page(&page).await;
                (page, body)
            })
            .buffered(self.fetch_concurrency)
            .collect()
            .await
    }
}

fn diff_snapshots(previous: &Snapshot, next: &Snapshot) -> Vec<Event> {
    let old: BTreeMap<&str, &str> = previous
        .iter()
        .map(|(_, e)| (e.prop.as_str(), e.value.as_str()))
        .collect();
    let new: BTreeMap<&str, &str> = next
        .iter()
        .map(|(_, e)| (e.prop.as_str(), e.value.as_str()))
        .collect();

    let mut events = Vec::new();
    for (prop, value) in &new {
        match old.get(prop) {
            Some(old_value) if old_value != value => events.push(Event::ValueChanged {
                prop: prop.to_string(),
                old: old_value.to_string(),
                new: value.to_string(),
            }),
            None => events.push(Event::EntityAppeared {
                prop: prop.to_string(),
                value: value.to_string(),
            }),
            _ => {}
        }
    }
    for prop in old.keys() {
        if !new.contains_key(prop) {
            events.push(Event::EntityVanished {
                prop: prop.to_string(),
            });
        }
    }
    events
}

fn validate_write(spec: &EntitySpec, value: &str) -> std::result::Result<String, String> {
    if !spec.writable {
        return Err("property is read-only".to_string());
    }

    match spec.data_type {
        DataType::Real => {
            let v: f64 = value.parse().map_err(|_| format!("not a number: {value}"))?;
            if !v.is_finite() {
                return Err(format!("not a finite number: {value}"));
            }
            if let Some(min) = spec.min
                && v < min
            {
                return Err(format!("out of range: {v} < {min}"));
            }
            if let Some(max) = spec.max
                && v > max
            {
                return Err(format!("out of range: {v} > {max}"));
            }
            Ok(value.to_string())
        }
        DataType::Bool => match value {
            "0" | "1" => Ok(value.to_string()),
            _ => Err(format!("not a boolean: {value} (expected 0 or 1)")),
        },
        DataType::Enum => {
            if spec.options.iter().any(|o| o.value == value) {
                return Ok(value.to_string());
            }
            for option in &spec.options {
                if option.label_cz == value || option.label_en == value {
                    return Ok(option.value.clone());
                }
            }
            let valid: Vec<&str> = spec.options.iter().map(|o| o.value.as_str()).collect();
            Err(format!("unknown option: {value} (valid: {valid:?})"))
        }
        DataType::Action => Ok("1".to_string()),
        DataType::String | DataType::Time => Ok(value.to_string()),
    }
}
