use std::sync::Arc;

use anyhow::{Result, anyhow};
use chrono::{Local, NaiveDate};
use serde_json::Value;
use tokio::task::JoinSet;

use crate::{
  enrichment::PlaceResolver,
  registry::StyleFamily,
  source::TripSource,
  surface::MapSurface,
  task_tracker::{TaskCategory, TaskGuard},
  timeline::{EnrichmentResult, RenderGrid, build_document, parse_document},
  trace::{FeatureCollection, parse_feature_collection, style_feature_in},
};

/// Counts accepted date changes. Grids and lookups carry the generation they were
/// started for, anything arriving for an older one is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
  #[must_use]
  pub fn next(self) -> Self {
    Self(self.0 + 1)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavState {
  #[default]
  Idle,
  Loading(NaiveDate),
  Loaded(NaiveDate),
}

/// Permission to load one date, valid while its generation is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
  pub date: NaiveDate,
  pub generation: Generation,
}

#[derive(Debug, Default)]
pub struct DateNavigator {
  state: NavState,
  generation: Generation,
}

impl DateNavigator {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  #[must_use]
  pub fn state(&self) -> NavState {
    self.state
  }

  #[must_use]
  pub fn generation(&self) -> Generation {
    self.generation
  }

  /// Starts loading `date` unless it is already shown or on its way.
  pub fn date_changed(&mut self, date: NaiveDate) -> Option<Ticket> {
    match self.state {
      NavState::Loading(current) | NavState::Loaded(current) if current == date => {
        log::debug!("{date} is already {:?}, skipping", self.state);
        None
      }
      _ => {
        self.generation = self.generation.next();
        self.state = NavState::Loading(date);
        Some(Ticket {
          date,
          generation: self.generation,
        })
      }
    }
  }

  #[must_use]
  pub fn is_current(&self, generation: Generation) -> bool {
    generation == self.generation
  }

  /// Marks the ticket's date as shown. Stale tickets change nothing.
  pub fn completed(&mut self, ticket: Ticket) -> bool {
    if !self.is_current(ticket.generation) {
      return false;
    }
    self.state = NavState::Loaded(ticket.date);
    true
  }

  /// Gives up on the ticket's date so selecting it again loads it again.
  pub fn failed(&mut self, ticket: Ticket) {
    if self.is_current(ticket.generation) {
      self.state = NavState::Idle;
    }
  }
}

/// Reads the date from a location fragment such as `#2015-06-01`. Anything else means
/// today.
#[must_use]
pub fn parse_date_fragment(fragment: &str, today: NaiveDate) -> NaiveDate {
  fragment
    .split('#')
    .next_back()
    .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
    .unwrap_or(today)
}

#[must_use]
pub fn today() -> NaiveDate {
  Local::now().date_naive()
}

/// The trip table page: one grid at a time, place names filled in as lookups land.
pub struct TimelineSession {
  source: Arc<dyn TripSource>,
  resolver: Option<PlaceResolver>,
  navigator: DateNavigator,
  grid: Option<RenderGrid>,
  lookups: JoinSet<EnrichmentResult>,
}

impl TimelineSession {
  #[must_use]
  pub fn new(source: Arc<dyn TripSource>, resolver: Option<PlaceResolver>) -> Self {
    Self {
      source,
      resolver,
      navigator: DateNavigator::new(),
      grid: None,
      lookups: JoinSet::new(),
    }
  }

  #[must_use]
  pub fn grid(&self) -> Option<&RenderGrid> {
    self.grid.as_ref()
  }

  #[must_use]
  pub fn state(&self) -> NavState {
    self.navigator.state()
  }

  /// Shows `date`. Returns `false` if the date was already shown or loading.
  ///
  /// The previous grid is discarded before fetching. Its outstanding lookups keep
  /// running and are dropped when they land.
  pub async fn show(&mut self, date: NaiveDate) -> Result<bool> {
    let Some(ticket) = self.navigator.date_changed(date) else {
      return Ok(false);
    };
    self.grid = None;

    let payload = {
      let _guard = TaskGuard::new(TaskCategory::TripFetch, format!("trips {date}"));
      self.source.trips(date).await
    };
    let grid = payload.and_then(|payload| self.layout(ticket, &payload));
    match grid {
      Ok(grid) => {
        if !self.navigator.completed(ticket) {
          return Ok(false);
        }
        self.grid = Some(grid);
        self.start_lookups();
        Ok(true)
      }
      Err(e) => {
        self.navigator.failed(ticket);
        Err(e)
      }
    }
  }

  fn layout(&self, ticket: Ticket, payload: &Value) -> Result<RenderGrid> {
    let document = parse_document(payload).map_err(|e| anyhow!("{e}"))?;
    Ok(build_document(&document, ticket.generation))
  }

  fn start_lookups(&mut self) {
    let (Some(resolver), Some(grid)) = (&self.resolver, &mut self.grid) else {
      return;
    };
    for request in grid.take_enrichment_requests() {
      let resolver = resolver.clone();
      self
        .lookups
        .spawn(async move { resolver.resolve(request).await });
    }
  }

  fn apply(&mut self, result: &EnrichmentResult) -> bool {
    if !self.navigator.is_current(result.generation) {
      log::debug!("Place name for {:?} arrived after a date change", result.cell);
      return false;
    }
    self
      .grid
      .as_mut()
      .is_some_and(|grid| grid.apply_enrichment(result))
  }

  /// Applies the lookups that already landed without waiting. Returns how many changed
  /// the grid.
  pub fn apply_ready(&mut self) -> usize {
    let mut applied = 0;
    while let Some(joined) = self.lookups.try_join_next() {
      match joined {
        Ok(result) => applied += usize::from(self.apply(&result)),
        Err(e) => log::warn!("Place lookup task failed: {e}"),
      }
    }
    applied
  }

  /// Waits for every outstanding lookup and applies those still current.
  pub async fn settle(&mut self) -> usize {
    let mut applied = 0;
    while let Some(joined) = self.lookups.join_next().await {
      match joined {
        Ok(result) => applied += usize::from(self.apply(&result)),
        Err(e) => log::warn!("Place lookup task failed: {e}"),
      }
    }
    applied
  }
}

/// A map page showing one overlay family.
pub struct TraceSession<M: MapSurface> {
  source: Arc<dyn TripSource>,
  surface: M,
  family: StyleFamily,
  navigator: DateNavigator,
}

impl<M: MapSurface> TraceSession<M> {
  pub fn new(source: Arc<dyn TripSource>, surface: M, family: StyleFamily) -> Self {
    Self {
      source,
      surface,
      family,
      navigator: DateNavigator::new(),
    }
  }

  pub fn surface(&self) -> &M {
    &self.surface
  }

  #[must_use]
  pub fn state(&self) -> NavState {
    self.navigator.state()
  }

  /// Shows the trace of `date`. Returns `false` if the date was already shown or loading.
  pub async fn show(&mut self, date: NaiveDate) -> Result<bool> {
    let Some(ticket) = self.navigator.date_changed(date) else {
      return Ok(false);
    };
    self.surface.clear();

    let payload = {
      let _guard = TaskGuard::new(TaskCategory::TraceFetch, format!("trace {date}"));
      self.source.trace(date).await
    };
    let collection =
      payload.and_then(|p| parse_feature_collection(&p).map_err(|e| anyhow!("{e}")));
    match collection {
      Ok(collection) => {
        if !self.navigator.completed(ticket) {
          return Ok(false);
        }
        self.draw(&collection);
        Ok(true)
      }
      Err(e) => {
        self.navigator.failed(ticket);
        Err(e)
      }
    }
  }

  /// Shows the current predictions, which are not tied to a date.
  pub async fn show_predictions(&mut self) -> Result<usize> {
    self.surface.clear();
    let payload = {
      let _guard = TaskGuard::new(TaskCategory::TraceFetch, "predictions");
      self.source.predictions().await?
    };
    let collection = parse_feature_collection(&payload).map_err(|e| anyhow!("{e}"))?;
    Ok(self.draw(&collection))
  }

  /// Puts the features on the surface and styles them. Returns how many are drawn.
  fn draw(&mut self, collection: &FeatureCollection) -> usize {
    self.surface.add_features(&collection.features);
    let mut drawn = 0;
    for (index, feature) in collection.features.iter().enumerate() {
      let style = style_feature_in(self.family, feature);
      drawn += usize::from(style.is_some());
      self.surface.set_style(index, style);
    }
    if let Some(bounds) = collection.fit_bounds() {
      self.surface.fit_bounds(bounds);
    }
    log::debug!(
      "Drew {drawn} of {} {:?} features",
      collection.features.len(),
      self.family
    );
    drawn
  }
}
