// SPDX-License-Identifier: GPL-3.0-only
//! Brightness coordinator.
//!
//! The only surface UI and input layers consume. One actor task owns the
//! per-device brightness cache and all shared state; commands arrive over a
//! channel, so every mutation happens on that single context. Hardware I/O
//! always runs on blocking worker tasks and reports back as internal
//! messages, never touching the cache directly. At most one operation is in
//! flight per device; work arriving while the channel is busy waits for the
//! completion message, and a reconcile read that began before a newer user
//! set is discarded when it lands.
//!
//! Rapid set requests are debounced per device: each call supersedes the
//! pending timer, so of a burst only the final value reaches hardware, and
//! a write whose target equals the last confirmed value is skipped outright.
//! The cache is updated only after a confirmed hardware read or write; the
//! skip can therefore never mask a first real write.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::StoredState;
use crate::events::{DeviceInfo, Snapshot, UiEvent};
use crate::monitor::{BrightnessState, Device, DeviceId, DeviceRegistry, Verification};
use crate::platform::Platform;
use crate::vcp::VcpController;

/// Fraction of the full range one `increase`/`decrease` step moves.
pub const BRIGHTNESS_STEP: f32 = 1.0 / 16.0;

/// Quiet interval a burst of set calls must survive before hardware sees it.
pub const DEBOUNCE_INTERVAL: Duration = Duration::from_millis(50);

/// Displayed for a device whose real value is not yet known. Not cached.
const NEUTRAL_PERCENTAGE: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    pub debounce: Duration,
    pub step: f32,
    /// Persist learned per-monitor state to disk after each discovery pass.
    pub persist: bool,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            debounce: DEBOUNCE_INTERVAL,
            step: BRIGHTNESS_STEP,
            persist: true,
        }
    }
}

enum Request {
    Increase,
    Decrease,
    SetExact { value: f32, show_overlay: bool },
    SelectDevice(usize),
    Resync,
    // Internal: timers and worker tasks reporting back.
    DebounceFired { id: DeviceId, generation: u64 },
    WriteConfirmed { id: DeviceId, state: BrightnessState },
    WriteFailed { id: DeviceId },
    ReadCompleted {
        id: DeviceId,
        generation: u64,
        state: Option<BrightnessState>,
    },
    RescanCompleted { registry: DeviceRegistry },
}

/// Handle to the coordinator actor.
///
/// Cloneable and cheap; all commands are fire-and-forget and marshaled onto
/// the coordinator's single context before touching any state.
#[derive(Clone)]
pub struct Coordinator {
    tx: mpsc::UnboundedSender<Request>,
    snapshot_rx: watch::Receiver<Snapshot>,
    events_tx: broadcast::Sender<UiEvent>,
}

impl Coordinator {
    /// Spawn the coordinator on the current tokio runtime and kick off the
    /// initial discovery pass.
    pub fn spawn(
        platform: Box<dyn Platform>,
        vcp: VcpController,
        stored: StoredState,
        options: CoordinatorOptions,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::default());
        let (events_tx, _) = broadcast::channel(32);

        let task = CoordinatorTask {
            platform: Arc::new(Mutex::new(platform)),
            vcp,
            registry: DeviceRegistry::empty(),
            active: None,
            current_percentage: NEUTRAL_PERCENTAGE,
            cache: HashMap::new(),
            pending: HashMap::new(),
            ops: HashMap::new(),
            generation: 0,
            rescan_running: false,
            rescan_queued: false,
            stored,
            options,
            tx: tx.clone(),
            snapshot_tx,
            events_tx: events_tx.clone(),
        };
        tokio::spawn(task.run(rx));

        Self {
            tx,
            snapshot_rx,
            events_tx,
        }
    }

    /// Step the active device's brightness up by one step.
    pub fn increase(&self) {
        let _ = self.tx.send(Request::Increase);
    }

    /// Step the active device's brightness down by one step.
    pub fn decrease(&self) {
        let _ = self.tx.send(Request::Decrease);
    }

    /// Set the active device's brightness to `value` in `[0, 1]`.
    pub fn set_exact(&self, value: f32, show_overlay: bool) {
        let _ = self.tx.send(Request::SetExact {
            value,
            show_overlay,
        });
    }

    /// Switch the active device.
    pub fn select_device(&self, index: usize) {
        let _ = self.tx.send(Request::SelectDevice(index));
    }

    /// Re-run discovery and reconcile the active device's cached state.
    pub fn resync(&self) {
        let _ = self.tx.send(Request::Resync);
    }

    /// Latest published state.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Watch for state changes.
    pub fn watch(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_rx.clone()
    }

    /// Subscribe to overlay and topology events. Dropping the receiver
    /// unregisters the listener.
    pub fn subscribe_events(&self) -> broadcast::Receiver<UiEvent> {
        self.events_tx.subscribe()
    }

    /// Resync once per topology-change edge, after letting the hardware
    /// settle and draining event bursts.
    pub fn resync_on(&self, mut topology: mpsc::Receiver<()>, settle: Duration) {
        let this = self.clone();
        tokio::spawn(async move {
            while topology.recv().await.is_some() {
                tokio::time::sleep(settle).await;
                while topology.try_recv().is_ok() {}
                info!("topology changed, rescanning displays");
                this.resync();
            }
        });
    }
}

struct PendingWrite {
    generation: u64,
    target: BrightnessState,
    timer: JoinHandle<()>,
    /// The debounce timer fired while the channel was busy; dispatch as soon
    /// as the in-flight operation reports back.
    fired: bool,
}

/// Per-device hardware channel bookkeeping.
#[derive(Default)]
struct DeviceOps {
    /// An operation is currently running against this device's channel.
    in_flight: bool,
    /// A reconcile read should run once the channel is free.
    read_wanted: bool,
    /// Generation of the most recently scheduled write. Reads stamped with
    /// an older generation are stale and get discarded on completion.
    last_write_generation: u64,
}

struct CoordinatorTask {
    platform: Arc<Mutex<Box<dyn Platform>>>,
    vcp: VcpController,
    registry: DeviceRegistry,
    active: Option<usize>,
    /// In-memory percentage of the active device; moves ahead of hardware.
    current_percentage: f32,
    cache: HashMap<DeviceId, BrightnessState>,
    pending: HashMap<DeviceId, PendingWrite>,
    ops: HashMap<DeviceId, DeviceOps>,
    generation: u64,
    rescan_running: bool,
    rescan_queued: bool,
    stored: StoredState,
    options: CoordinatorOptions,
    tx: mpsc::UnboundedSender<Request>,
    snapshot_tx: watch::Sender<Snapshot>,
    events_tx: broadcast::Sender<UiEvent>,
}

impl CoordinatorTask {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Request>) {
        self.start_rescan();
        while let Some(request) = rx.recv().await {
            self.handle(request);
        }
        debug!("coordinator channel closed, shutting down");
    }

    fn handle(&mut self, request: Request) {
        match request {
            Request::Increase => self.step_by(self.options.step),
            Request::Decrease => self.step_by(-self.options.step),
            Request::SetExact {
                value,
                show_overlay,
            } => self.apply(value, show_overlay),
            Request::SelectDevice(index) => self.select(index),
            Request::Resync => self.start_rescan(),
            Request::DebounceFired { id, generation } => self.flush_write(id, generation),
            Request::WriteConfirmed { id, state } => {
                debug!(%id, raw = state.raw, "hardware write confirmed");
                // The device may have vanished in a rescan since the write
                // was dispatched; its id must not re-enter the cache.
                if self.registry.position_of(&id).is_some() {
                    self.cache.insert(id.clone(), state);
                }
                self.finish_op(id);
            }
            Request::WriteFailed { id } => {
                // Last-known state stays; the next set tries again.
                debug!(%id, "hardware write failed, cache left untouched");
                self.finish_op(id);
            }
            Request::ReadCompleted {
                id,
                generation,
                state,
            } => self.finish_read(id, generation, state),
            Request::RescanCompleted { registry } => self.finish_rescan(registry),
        }
    }

    fn step_by(&mut self, delta: f32) {
        let target = (self.current_percentage + delta).clamp(0.0, 1.0);
        self.apply(target, true);
    }

    fn apply(&mut self, value: f32, show_overlay: bool) {
        let value = value.clamp(0.0, 1.0);
        let Some(device) = self.active_device() else {
            debug!("no active device, ignoring brightness change");
            return;
        };

        // The in-memory value moves immediately so UI reflects the change
        // with zero latency; hardware follows after the quiet interval.
        self.current_percentage = value;
        self.publish();
        if show_overlay {
            let _ = self.events_tx.send(UiEvent::Overlay { percentage: value });
        }

        let target = BrightnessState::from_percentage(value, device.max_brightness());
        self.schedule_write(device.id().to_string(), target);
    }

    fn schedule_write(&mut self, id: DeviceId, target: BrightnessState) {
        self.generation += 1;
        let generation = self.generation;
        self.ops.entry(id.clone()).or_default().last_write_generation = generation;

        // At most one pending write per device; a new burst supersedes the
        // unfired timer.
        if let Some(previous) = self.pending.remove(&id) {
            previous.timer.abort();
        }

        let timer = {
            let tx = self.tx.clone();
            let id = id.clone();
            let quiet = self.options.debounce;
            tokio::spawn(async move {
                tokio::time::sleep(quiet).await;
                let _ = tx.send(Request::DebounceFired { id, generation });
            })
        };
        self.pending.insert(
            id,
            PendingWrite {
                generation,
                target,
                timer,
                fired: false,
            },
        );
    }

    fn flush_write(&mut self, id: DeviceId, generation: u64) {
        let Some(pending) = self.pending.get_mut(&id) else {
            return;
        };
        if pending.generation != generation {
            // A stale timer fired before its abort landed; the newer one is
            // still pending.
            return;
        }
        if self.ops.get(&id).is_some_and(|ops| ops.in_flight) {
            pending.fired = true;
            return;
        }
        self.dispatch_write(id);
    }

    /// Hand the pending write to a blocking worker. The channel must be free.
    fn dispatch_write(&mut self, id: DeviceId) {
        let Some(pending) = self.pending.remove(&id) else {
            return;
        };

        // Checked at dispatch time: the operation that just finished may
        // have confirmed this exact value already.
        if self.cache.get(&id).map(|s| s.raw) == Some(pending.target.raw) {
            debug!(%id, raw = pending.target.raw, "target equals last confirmed value, skipping write");
            return;
        }

        let Some(device) = self.device_by_id(&id) else {
            return;
        };
        self.ops.entry(id.clone()).or_default().in_flight = true;
        let vcp = self.vcp;
        let tx = self.tx.clone();
        let target = pending.target;
        tokio::task::spawn_blocking(move || match device.write_brightness(&vcp, target.raw) {
            Ok(()) => {
                let _ = tx.send(Request::WriteConfirmed { id, state: target });
            }
            Err(err) => {
                warn!(%id, error = %err, "brightness write failed");
                let _ = tx.send(Request::WriteFailed { id });
            }
        });
    }

    fn select(&mut self, index: usize) {
        let Some(device) = self.registry.get(index) else {
            warn!(index, "device index out of range, ignoring select");
            return;
        };
        self.active = Some(index);
        self.adopt_or_read(&device);
        self.publish();
    }

    /// Adopt cached state without a hardware round trip, or trigger one
    /// background read to populate the cache.
    fn adopt_or_read(&mut self, device: &Arc<Device>) {
        if let Some(state) = self.cache.get(device.id()) {
            self.current_percentage = state.percentage;
            return;
        }
        self.current_percentage = NEUTRAL_PERCENTAGE;
        if device.verification() == Verification::Full {
            self.request_read(device);
        }
    }

    /// Run a reconcile read when the channel is free, or mark one wanted.
    fn request_read(&mut self, device: &Arc<Device>) {
        let ops = self.ops.entry(device.id().to_string()).or_default();
        if ops.in_flight {
            ops.read_wanted = true;
            return;
        }
        ops.in_flight = true;
        self.spawn_read(device.clone());
    }

    fn spawn_read(&self, device: Arc<Device>) {
        let vcp = self.vcp;
        let tx = self.tx.clone();
        let generation = self.generation;
        tokio::task::spawn_blocking(move || {
            let id = device.id().to_string();
            let state = match device.read_brightness(&vcp) {
                Ok(reply) => Some(BrightnessState::from_raw(
                    reply.current_value,
                    device.max_brightness(),
                )),
                Err(err) => {
                    warn!(%id, error = %err, "brightness read failed");
                    None
                }
            };
            let _ = tx.send(Request::ReadCompleted {
                id,
                generation,
                state,
            });
        });
    }

    fn finish_read(&mut self, id: DeviceId, generation: u64, state: Option<BrightnessState>) {
        // A set issued after this read began outranks whatever the hardware
        // reported back then.
        let superseded = self
            .ops
            .get(&id)
            .is_some_and(|ops| ops.last_write_generation > generation);

        if let Some(state) = state {
            if superseded {
                debug!(%id, "read superseded by a newer set, discarding");
            } else if self.registry.position_of(&id).is_some() {
                self.cache.insert(id.clone(), state);
                if self.active_device().is_some_and(|d| d.id() == id) {
                    self.current_percentage = state.percentage;
                    self.publish();
                }
            }
        }
        self.finish_op(id);
    }

    /// Release the device's channel and dispatch whatever queued up behind
    /// the finished operation.
    fn finish_op(&mut self, id: DeviceId) {
        let read_wanted = match self.ops.get_mut(&id) {
            Some(ops) => {
                ops.in_flight = false;
                std::mem::take(&mut ops.read_wanted)
            }
            None => return,
        };

        if self.pending.get(&id).is_some_and(|p| p.fired) {
            self.dispatch_write(id);
        } else if read_wanted {
            if let Some(device) = self.device_by_id(&id) {
                if let Some(ops) = self.ops.get_mut(&id) {
                    ops.in_flight = true;
                }
                self.spawn_read(device);
            }
        }
    }

    fn start_rescan(&mut self) {
        if self.rescan_running {
            debug!("rescan already running, coalescing request");
            self.rescan_queued = true;
            return;
        }
        self.rescan_running = true;

        let platform = Arc::clone(&self.platform);
        let vcp = self.vcp;
        let stored = self.stored.clone();
        let tx = self.tx.clone();
        tokio::task::spawn_blocking(move || {
            let mut platform = platform.lock().unwrap();
            let registry = DeviceRegistry::discover(platform.as_mut(), &vcp, &stored);
            let _ = tx.send(Request::RescanCompleted { registry });
        });
    }

    fn finish_rescan(&mut self, registry: DeviceRegistry) {
        let previous_active = self
            .active
            .and_then(|i| self.registry.get(i))
            .map(|d| d.id().to_string());
        self.registry = registry;

        // Devices gone from the topology take their cache entries, channel
        // bookkeeping, and pending writes with them.
        self.cache
            .retain(|id, _| self.registry.position_of(id).is_some());
        let registry = &self.registry;
        self.ops.retain(|id, _| registry.position_of(id).is_some());
        self.pending.retain(|id, pending| {
            let keep = registry.position_of(id).is_some();
            if !keep {
                pending.timer.abort();
            }
            keep
        });

        for device in self.registry.devices() {
            self.stored.remember_max(device.id(), device.max_brightness());
        }
        if self.options.persist {
            if let Err(err) = self.stored.save() {
                warn!(error = %err, "failed to persist monitor state");
            }
        }

        // The previously active device keeps its role whenever its identity
        // survived the rescan; otherwise fall back to the first device.
        self.active = previous_active
            .and_then(|id| self.registry.position_of(&id))
            .or_else(|| (!self.registry.is_empty()).then_some(0));

        if let Some(device) = self.active_device() {
            if let Some(state) = self.cache.get(device.id()) {
                self.current_percentage = state.percentage;
            } else {
                self.current_percentage = NEUTRAL_PERCENTAGE;
            }
            // Reconcile cached state with the device's real value.
            if device.verification() == Verification::Full {
                self.request_read(&device);
            }
        }

        self.publish();
        let _ = self.events_tx.send(UiEvent::TopologyChanged);

        self.rescan_running = false;
        if std::mem::take(&mut self.rescan_queued) {
            self.start_rescan();
        }
    }

    fn active_device(&self) -> Option<Arc<Device>> {
        self.active.and_then(|i| self.registry.get(i))
    }

    fn device_by_id(&self, id: &str) -> Option<Arc<Device>> {
        self.registry.position_of(id).and_then(|i| self.registry.get(i))
    }

    fn publish(&self) {
        let devices = self
            .registry
            .devices()
            .iter()
            .map(|d| DeviceInfo {
                id: d.id().to_string(),
                name: d.name().to_string(),
                resolution: d.resolution(),
                refresh_hz: d.refresh_hz(),
            })
            .collect();
        let _ = self.snapshot_tx.send(Snapshot {
            percentage: self.current_percentage,
            active_name: self.active_device().map(|d| d.name().to_string()),
            connected: self.active.is_some(),
            devices,
            active_index: self.active,
        });
    }
}
