//! Structure generation service.
//!
//! A controller sends `GenerationRequest`s; every subscriber receives the
//! resulting `StructureEvent`s over its own channel. Requests are handled one
//! at a time per service instance and each one draws from its own generator.

use crate::chemistry::materials::{generate_material, GenerationOptions, Material, MaterialInfo};
use crate::core::error::{Result, StructureError};
use crate::core::structure::{StructureData, UnitCellParams};
use crate::synthesis::builder::SupercellRepeats;
use log::{debug, info, warn};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub material: Material,
    /// `None` uses the material's default supercell.
    pub repeats: Option<SupercellRepeats>,
    pub options: GenerationOptions,
}

impl GenerationRequest {
    pub fn new(material: Material) -> Self {
        Self {
            material,
            repeats: None,
            options: GenerationOptions::default(),
        }
    }

    pub fn with_repeats(mut self, repeats: SupercellRepeats) -> Self {
        self.repeats = Some(repeats);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.options.seed = Some(seed);
        self
    }
}

#[derive(Debug, Clone)]
pub enum StructureEvent {
    /// A new immutable snapshot replaced the previous one.
    StructureChanged {
        revision: u64,
        structure: Arc<StructureData>,
    },
    /// The selected material switched to a different space group.
    SpaceGroupUpdated {
        info: MaterialInfo,
        unit_cell: UnitCellParams,
    },
    GenerationFailed {
        request: GenerationRequest,
        error: StructureError,
    },
}

#[derive(Default)]
pub struct StructureService {
    subscribers: Vec<Sender<StructureEvent>>,
    current: Option<Arc<StructureData>>,
    current_material: Option<Material>,
    revision: u64,
}

impl StructureService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<StructureEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn current(&self) -> Option<Arc<StructureData>> {
        self.current.clone()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn publish(&mut self, event: StructureEvent) {
        let before = self.subscribers.len();
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        if self.subscribers.len() < before {
            debug!("dropped {} closed subscribers", before - self.subscribers.len());
        }
    }

    fn replace(&mut self, structure: StructureData) -> Arc<StructureData> {
        let snapshot = Arc::new(structure);
        self.revision += 1;
        self.current = Some(Arc::clone(&snapshot));
        self.publish(StructureEvent::StructureChanged {
            revision: self.revision,
            structure: Arc::clone(&snapshot),
        });
        snapshot
    }

    /// Runs one request to completion and notifies subscribers.
    ///
    /// On failure the previous snapshot stays current.
    pub fn handle(&mut self, request: GenerationRequest) -> Result<Arc<StructureData>> {
        let repeats = request
            .repeats
            .unwrap_or_else(|| request.material.default_repeats());

        match generate_material(request.material, repeats, &request.options) {
            Ok(structure) => {
                let family_changed = self
                    .current_material
                    .map(|m| m.family() != request.material.family())
                    .unwrap_or(true);
                self.current_material = Some(request.material);
                if family_changed {
                    self.publish(StructureEvent::SpaceGroupUpdated {
                        info: request.material.info(),
                        unit_cell: structure.unit_cell,
                    });
                }
                Ok(self.replace(structure))
            }
            Err(error) => {
                warn!("generation of {} failed: {}", request.material, error);
                self.publish(StructureEvent::GenerationFailed {
                    request,
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    /// Publishes an externally produced structure (e.g. a CIF import).
    pub fn load(&mut self, structure: StructureData) -> Arc<StructureData> {
        self.current_material = None;
        self.replace(structure)
    }

    /// Serves requests until every sender of `requests` is dropped.
    pub fn run(mut self, requests: Receiver<GenerationRequest>) -> Self {
        for request in requests {
            // failures were already published
            let _ = self.handle(request);
        }
        info!("structure service stopped at revision {}", self.revision);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn small(material: Material) -> GenerationRequest {
        GenerationRequest::new(material)
            .with_repeats(SupercellRepeats::new(1, 1, 1).unwrap())
            .with_seed(3)
    }

    #[test]
    fn subscribers_see_space_group_then_structure() {
        let mut service = StructureService::new();
        let rx = service.subscribe();
        service.handle(small(Material::Lfp)).unwrap();

        match rx.recv().unwrap() {
            StructureEvent::SpaceGroupUpdated { info, unit_cell } => {
                assert_eq!(info.space_group, "Pnma");
                assert_eq!(unit_cell, UnitCellParams::orthorhombic(10.33, 6.01, 4.69));
            }
            other => panic!("unexpected {:?}", other),
        }
        match rx.recv().unwrap() {
            StructureEvent::StructureChanged { revision, structure } => {
                assert_eq!(revision, 1);
                assert_eq!(structure.len(), 28);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn same_family_skips_space_group_event() {
        let mut service = StructureService::new();
        service.handle(small(Material::Ncm811)).unwrap();
        let rx = service.subscribe();
        service.handle(small(Material::Ncm622)).unwrap();
        assert!(matches!(rx.try_recv(), Ok(StructureEvent::StructureChanged { revision: 2, .. })));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn family_switch_reports_the_new_cell() {
        let mut service = StructureService::new();
        service.handle(small(Material::Lfp)).unwrap();
        let rx = service.subscribe();
        service.handle(small(Material::Ncm111)).unwrap();
        match rx.try_recv() {
            Ok(StructureEvent::SpaceGroupUpdated { info, unit_cell }) => {
                assert_eq!(info.space_group_number, 166);
                assert_eq!(unit_cell, UnitCellParams::hexagonal(2.816, 14.052));
                assert_eq!(Some(unit_cell), service.current().map(|s| s.unit_cell));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn failure_keeps_previous_snapshot() {
        let mut service = StructureService::new();
        let first = service.handle(small(Material::Lco)).unwrap();
        let rx = service.subscribe();

        let mut bad = small(Material::Lco);
        bad.repeats = Some(SupercellRepeats { nx: 0, ny: 1, nz: 1 });
        assert!(service.handle(bad).is_err());
        assert!(matches!(rx.try_recv(), Ok(StructureEvent::GenerationFailed { .. })));
        assert!(Arc::ptr_eq(&service.current().unwrap(), &first));
    }

    #[test]
    fn runs_on_a_worker_thread() {
        let mut service = StructureService::new();
        let events = service.subscribe();
        let (tx, requests) = channel();
        let worker = thread::spawn(move || service.run(requests));

        tx.send(small(Material::Lco)).unwrap();
        tx.send(small(Material::Lmfp)).unwrap();
        drop(tx);
        let service = worker.join().unwrap();

        assert_eq!(service.revision(), 2);
        let changes = events
            .try_iter()
            .filter(|e| matches!(e, StructureEvent::StructureChanged { .. }))
            .count();
        assert_eq!(changes, 2);
    }
}
