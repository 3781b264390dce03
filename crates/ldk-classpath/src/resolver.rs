use std::collections::HashSet;
use std::sync::Arc;

use ldk_types::{split_classpath, Location, LocationKey};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::ResolverConfig;
use crate::error::ClasspathError;
use crate::resource::Resource;
use crate::unit::{open_unit, LoaderUnit};

/// Mutable resolver state, guarded by one lock per resolver.
#[derive(Default)]
struct ResolverState {
    /// Original search path, append-only.
    path: Vec<Location>,
    path_keys: HashSet<LocationKey>,
    /// Index of the next search path entry not yet consumed.
    next_path: usize,
    /// Locations declared by manifests, popped LIFO.
    pending: Vec<Location>,
    /// Units in materialization order.
    units: Vec<Arc<dyn LoaderUnit>>,
    unit_keys: HashSet<LocationKey>,
    closed: bool,
}

/// Ordered, lazily materialized classpath.
///
/// Units are created only when a query walks past the units that already
/// exist. Materializing the next unit first drains the manifest expansion
/// stack, then consumes the next search path entry. An archive that declares
/// a `Class-Path` pushes those locations in reverse, so they pop in declared
/// order ahead of every remaining original entry (depth-first expansion).
///
/// Queries only take the lock to fetch a unit; the unit itself is queried
/// without it.
pub struct ClasspathResolver {
    config: ResolverConfig,
    state: Mutex<ResolverState>,
}

impl ClasspathResolver {
    /// Create a resolver over `locations`, in order. Duplicates are dropped.
    pub fn new(locations: impl IntoIterator<Item = Location>, config: ResolverConfig) -> Self {
        let resolver = Self {
            config,
            state: Mutex::new(ResolverState::default()),
        };
        for location in locations {
            resolver.add_location(location);
        }
        resolver
    }

    /// Create a resolver from a platform classpath string.
    ///
    /// Elements that do not parse as locations are skipped.
    pub fn from_classpath(classpath: &str, config: ResolverConfig) -> Self {
        let locations = Self::classpath_locations(classpath, &config);
        Self::new(locations, config)
    }

    /// Split a platform classpath string into locations under `config`.
    ///
    /// Elements that do not parse are skipped, and logged only in
    /// diagnostic mode.
    pub fn classpath_locations(classpath: &str, config: &ResolverConfig) -> Vec<Location> {
        let elements = split_classpath(classpath, config.empty_element_is_cwd);
        let mut locations = Vec::with_capacity(elements.len());
        for element in elements {
            match Location::parse(&element) {
                Ok(location) => locations.push(location),
                Err(e) => {
                    if config.diagnostics {
                        warn!(element = %element, error = %e, "skipping classpath element");
                    }
                }
            }
        }
        locations
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Append a location to the search path.
    ///
    /// Silently ignored when the resolver is closed or the location is
    /// already on the search path.
    pub fn add_location(&self, location: Location) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        if state.path_keys.insert(location.key()) {
            state.path.push(location);
        }
    }

    /// Snapshot of the original search path.
    pub fn search_path(&self) -> Vec<Location> {
        self.state.lock().path.clone()
    }

    /// Locations of the units materialized so far, in order.
    pub fn materialized(&self) -> Vec<Location> {
        self.state
            .lock()
            .units
            .iter()
            .map(|unit| unit.location().clone())
            .collect()
    }

    /// Number of units materialized so far.
    pub fn unit_count(&self) -> usize {
        self.state.lock().units.len()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Materialize every remaining unit and return the total count.
    pub fn materialize_all(&self) -> usize {
        let mut index = 0;
        while self.unit(index).is_some() {
            index += 1;
        }
        index
    }

    /// The unit at `index`, materializing units up to it if needed.
    ///
    /// Returns `None` when the search path and the expansion stack are both
    /// exhausted before reaching `index`, or when the resolver is closed.
    pub fn unit(&self, index: usize) -> Option<Arc<dyn LoaderUnit>> {
        let mut state = self.state.lock();
        if state.closed {
            return None;
        }

        while state.units.len() <= index {
            let location = match state.pending.pop() {
                Some(location) => location,
                None => {
                    let location = state.path.get(state.next_path)?.clone();
                    state.next_path += 1;
                    location
                }
            };

            let key = location.key();
            if state.unit_keys.contains(&key) {
                continue;
            }

            let unit = match open_unit(&location, &self.config) {
                Ok(unit) => unit,
                Err(e) => {
                    self.diagnose(&location, &e);
                    continue;
                }
            };
            let extension = match unit.extension_class_path() {
                Ok(extension) => extension,
                Err(e) => {
                    self.diagnose(&location, &e);
                    if let Err(e) = unit.close() {
                        self.diagnose(&location, &e);
                    }
                    continue;
                }
            };

            debug!(
                index = state.units.len(),
                location = %location,
                declared = extension.len(),
                "materialized loader unit"
            );
            state.pending.extend(extension.into_iter().rev());
            state.unit_keys.insert(key);
            state.units.push(unit);
        }

        Some(Arc::clone(&state.units[index]))
    }

    /// Find the first unit containing `name`.
    ///
    /// Units are consulted strictly in materialization order, so earlier
    /// entries shadow later ones.
    pub fn find_resource(&self, name: &str) -> Option<Resource> {
        self.resources(name).next()
    }

    /// Every resource named `name`, in classpath order.
    ///
    /// The returned iterator is lazy: it materializes units only as it
    /// advances. Each call starts a fresh enumeration.
    pub fn resources(&self, name: &str) -> ResourceIter<'_> {
        ResourceIter {
            resolver: self,
            name: name.to_string(),
            index: 0,
        }
    }

    /// Close every materialized unit and stop accepting locations.
    ///
    /// Per-unit failures are collected, not raised. A second call does no
    /// work and returns an empty list.
    pub fn close(&self) -> Vec<ClasspathError> {
        let mut state = self.state.lock();
        if state.closed {
            return Vec::new();
        }
        state.closed = true;

        let failures: Vec<ClasspathError> = state
            .units
            .iter()
            .filter_map(|unit| unit.close().err())
            .collect();
        debug!(
            units = state.units.len(),
            failures = failures.len(),
            "closed classpath resolver"
        );
        failures
    }

    fn diagnose(&self, location: &Location, error: &ClasspathError) {
        if self.config.diagnostics {
            warn!(location = %location, error = %error, "skipping classpath entry");
        }
    }
}

impl std::fmt::Debug for ClasspathResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ClasspathResolver")
            .field("search_path", &state.path.len())
            .field("units", &state.units.len())
            .field("pending", &state.pending.len())
            .field("closed", &state.closed)
            .finish()
    }
}

/// Lazy iterator over every resource with a given name.
pub struct ResourceIter<'a> {
    resolver: &'a ClasspathResolver,
    name: String,
    index: usize,
}

impl Iterator for ResourceIter<'_> {
    type Item = Resource;

    fn next(&mut self) -> Option<Resource> {
        loop {
            let unit = self.resolver.unit(self.index)?;
            self.index += 1;
            match unit.get_resource(&self.name) {
                Ok(Some(resource)) => return Some(resource),
                Ok(None) => {}
                Err(e) => self.resolver.diagnose(unit.location(), &e),
            }
        }
    }
}
