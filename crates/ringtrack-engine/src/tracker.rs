//! The tracking driver.
//!
//! A [`Tracker`] owns a placed copy of its line: the element arena (on the
//! backend's placement), the offset table and the type-id table. The
//! kernel is obtained from the compilation cache on the first
//! [`track`](Tracker::track) and held until the line changes.
//!
//! # Ownership model
//!
//! Tracking takes `&mut self` and `&mut Particles`; the particles are
//! updated in place and the call returns only after the kernel finished.
//! Turn-by-turn records come back in the [`TrackOutcome`] rather than
//! living on the tracker.

use std::sync::Arc;
use std::time::Instant;

use ringtrack_arena::Arena;
use ringtrack_core::{Backend, ConfigError, LocalParticle, ShapeId};
use ringtrack_element::ElementSequence;
use ringtrack_kernel::{
    CacheOutcome, CompiledKernel, KernelArgs, KernelCache, KernelRequest, MonitorArg,
};

use crate::config::TrackerConfig;
use crate::error::TrackError;
use crate::line::Line;
use crate::metrics::TrackMetrics;
use crate::monitor::{MonitorRequest, TurnByTurnMonitor};
use crate::particles::Particles;

/// What to track in one [`Tracker::track`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackRequest {
    /// First element of every turn. Default: 0.
    pub ele_start: usize,
    /// Elements per turn. Default: the rest of the line from `ele_start`.
    pub num_elements: Option<usize>,
    /// Turns. Default: 1.
    pub num_turns: usize,
    /// Turn-by-turn recording. Default: off.
    pub monitor: MonitorRequest,
}

impl Default for TrackRequest {
    fn default() -> Self {
        Self {
            ele_start: 0,
            num_elements: None,
            num_turns: 1,
            monitor: MonitorRequest::Off,
        }
    }
}

impl TrackRequest {
    /// Track the full line for `num_turns` turns.
    pub fn turns(num_turns: usize) -> Self {
        Self {
            num_turns,
            ..Self::default()
        }
    }

    /// Restrict every turn to `num_elements` elements from `ele_start`.
    pub fn range(mut self, ele_start: usize, num_elements: usize) -> Self {
        self.ele_start = ele_start;
        self.num_elements = Some(num_elements);
        self
    }

    /// Choose the monitor.
    pub fn monitor(mut self, monitor: MonitorRequest) -> Self {
        self.monitor = monitor;
        self
    }
}

/// Result of a successful [`Tracker::track`] call.
#[derive(Clone, Debug)]
pub struct TrackOutcome {
    /// Turn-by-turn records when the request asked for them.
    pub recording: Option<TurnByTurnMonitor>,
    /// Timing and loss counts.
    pub metrics: TrackMetrics,
}

/// Tracks particle batches through one line on one backend.
#[derive(Debug)]
pub struct Tracker {
    line: Line,
    config: TrackerConfig,
    sequence: ElementSequence,
    /// Copy of the sequence arena on the backend's device, if any.
    device_arena: Option<Arena>,
    offsets: Vec<u64>,
    type_ids: Vec<ShapeId>,
    cache: Option<Arc<KernelCache>>,
    kernel: Option<Arc<CompiledKernel>>,
}

impl Tracker {
    /// A tracker compiling through the process-wide cache.
    pub fn new(line: Line, config: TrackerConfig) -> Result<Self, TrackError> {
        Self::build(line, config, None)
    }

    /// A tracker compiling through `cache`.
    pub fn with_cache(
        line: Line,
        config: TrackerConfig,
        cache: Arc<KernelCache>,
    ) -> Result<Self, TrackError> {
        Self::build(line, config, Some(cache))
    }

    fn build(
        line: Line,
        config: TrackerConfig,
        cache: Option<Arc<KernelCache>>,
    ) -> Result<Self, TrackError> {
        config.validate()?;
        let (sequence, device_arena) = place(&line, &config)?;
        Ok(Self {
            offsets: sequence.offsets(),
            type_ids: sequence.type_ids(),
            line,
            config,
            sequence,
            device_arena,
            cache,
            kernel: None,
        })
    }

    /// The line being tracked.
    pub fn line(&self) -> &Line {
        &self.line
    }

    /// The configuration.
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// The placed element sequence.
    pub fn sequence(&self) -> &ElementSequence {
        &self.sequence
    }

    /// Backend of this tracker.
    pub fn backend(&self) -> Backend {
        self.config.backend
    }

    /// The current kernel, if one has been obtained.
    pub fn kernel(&self) -> Option<&Arc<CompiledKernel>> {
        self.kernel.as_ref()
    }

    /// Generated source of the current kernel, if one has been obtained.
    pub fn source(&self) -> Option<&str> {
        self.kernel.as_deref().map(CompiledKernel::source)
    }

    fn cache(&self) -> &KernelCache {
        match &self.cache {
            Some(cache) => cache.as_ref(),
            None => KernelCache::global(),
        }
    }

    fn arena(&self) -> &Arena {
        self.device_arena
            .as_ref()
            .unwrap_or_else(|| self.sequence.arena())
    }

    /// Obtain the kernel now instead of on the first `track`.
    pub fn prepare(&mut self) -> Result<Arc<CompiledKernel>, TrackError> {
        self.ensure_kernel().map(|(kernel, _)| kernel)
    }

    fn ensure_kernel(&mut self) -> Result<(Arc<CompiledKernel>, bool), TrackError> {
        if let Some(kernel) = &self.kernel {
            return Ok((Arc::clone(kernel), false));
        }
        let request = KernelRequest {
            registry: self.sequence.registry(),
            backend: self.config.backend,
            global_xy_limit: self.config.global_xy_limit,
            aperture_policy: self.config.aperture_policy,
            save_source_as: self.config.save_source_as.as_deref(),
        };
        let (kernel, outcome) = self.cache().fetch(&request)?;
        self.kernel = Some(Arc::clone(&kernel));
        Ok((kernel, outcome == CacheOutcome::Compiled))
    }

    /// Replace the line. The next `track` looks the kernel up again: a
    /// cache hit if the shape set is unchanged, one compilation otherwise.
    pub fn replace_line(&mut self, line: Line) -> Result<(), TrackError> {
        let (sequence, device_arena) = place(&line, &self.config)?;
        self.offsets = sequence.offsets();
        self.type_ids = sequence.type_ids();
        self.sequence = sequence;
        self.device_arena = device_arena;
        self.line = line;
        self.kernel = None;
        Ok(())
    }

    /// Track `particles` in place.
    ///
    /// The element range, monitor mode and monitor size are checked before
    /// anything else; on error no particle has been touched.
    pub fn track(
        &mut self,
        particles: &mut Particles,
        request: TrackRequest,
    ) -> Result<TrackOutcome, TrackError> {
        let started = Instant::now();
        let len = self.sequence.len();
        let num_elements = request
            .num_elements
            .unwrap_or_else(|| len.saturating_sub(request.ele_start));
        self.sequence.check_range(request.ele_start, num_elements)?;
        if request.monitor == MonitorRequest::External {
            return Err(ConfigError::NotImplemented {
                feature: "caller-supplied turn-by-turn monitor",
            }
            .into());
        }
        let n = particles.len();
        let mut recording = match request.monitor {
            MonitorRequest::On => Some(TurnByTurnMonitor::new(
                0,
                i64::try_from(request.num_turns).unwrap_or(i64::MAX),
                n,
                self.config.arena.max_capacity,
            )?),
            _ => None,
        };

        let (kernel, compiled) = self.ensure_kernel()?;
        let kernel_us = started.elapsed().as_micros() as u64;

        let lost_before = particles.num_lost();
        if n > 0 && lost_before == n {
            log::warn!("all {n} particles are already lost; nothing to track");
        }
        log::debug!(
            "launching {} on {n} particles, {} turns, elements {}..{}",
            kernel.id(),
            request.num_turns,
            request.ele_start,
            request.ele_start + num_elements
        );

        let launch_started = Instant::now();
        let mut local = particles.gather();
        let monitor = match recording.as_mut() {
            Some(m) => MonitorArg::recording(m.start_at_turn(), m.stop_at_turn(), m.records_mut()),
            None => MonitorArg::placeholder(),
        };
        kernel.launch(KernelArgs {
            arena: self.arena(),
            ele_offsets: &self.offsets,
            ele_type_ids: &self.type_ids,
            particles: &mut local,
            num_turns: request.num_turns,
            ele_start: request.ele_start,
            num_elements,
            monitor,
            n_threads: n,
        })?;
        particles.scatter(&local)?;
        let launch_us = launch_started.elapsed().as_micros() as u64;

        Ok(TrackOutcome {
            recording,
            metrics: TrackMetrics {
                kernel: Some(kernel.id()),
                compiled,
                kernel_us,
                launch_us,
                total_us: started.elapsed().as_micros() as u64,
                particles: n,
                turns: request.num_turns,
                elements: num_elements,
                lost_before,
                lost_after: particles.num_lost(),
            },
        })
    }

    /// Track one working particle through element `index` only.
    ///
    /// Available on [`Backend::CpuSerial`] only.
    pub fn track_element(
        &mut self,
        index: usize,
        particle: &mut LocalParticle,
    ) -> Result<(), TrackError> {
        if !self.config.backend.is_host_serial() {
            return Err(ConfigError::UnsupportedBackend {
                backend: self.config.backend,
                operation: "track_element",
            }
            .into());
        }
        self.sequence.check_range(index, 1)?;
        let (kernel, _) = self.ensure_kernel()?;
        kernel.track_element(
            self.arena(),
            self.offsets[index],
            self.type_ids[index],
            particle,
        )?;
        Ok(())
    }
}

/// Place `line` in a fresh arena and copy it to the backend's device when
/// the backend is not a host backend.
fn place(line: &Line, config: &TrackerConfig) -> Result<(ElementSequence, Option<Arena>), TrackError> {
    let sequence = ElementSequence::place(&line.element_refs(), line.names(), config.arena.clone())?;
    let placement = config.backend.placement();
    let device_arena = (placement != sequence.arena().placement())
        .then(|| sequence.arena().to_placement(placement));
    log::debug!(
        "placed {} elements ({} shapes, {} bytes) for {}",
        sequence.len(),
        sequence.registry().len(),
        sequence.arena().used_bytes(),
        config.backend
    );
    Ok((sequence, device_arena))
}
