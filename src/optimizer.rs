//! Optimierungslogik für die Beladung eines Containers.
//!
//! Dieser Modul steuert die Suche des EB-AFIT-Verfahrens:
//! - alle sinnvollen Orientierungen des Containers
//! - je Orientierung alle Start-Schichtdicken als eigener Probelauf
//! - Auswahl des besten Probelaufs (Volumen bzw. Gewichtsabweichung)
//! - Wiederholung des besten Laufs mit Aufzeichnung der Platzierungen

use rayon::prelude::*;
use tracing::{debug, info};

use crate::layer::{LayerBuilder, PackingProblem, RunMode, RunOutcome};
use crate::model::{Container, ItemType, PackedItem};
use crate::orientation::ContainerOrientation;
use crate::thickness::candidate_layers;

/// Konfiguration für den Packing-Algorithmus.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PackingConfig {
    /// Gewichtsgrenze und dimensionales Gewicht berücksichtigen
    pub weighted: bool,
    /// Divisor für das dimensionale Gewicht (gerundetes Volumen / Faktor)
    pub dim_factor: f64,
    /// Allgemeine numerische Toleranz
    pub epsilon: f64,
    /// Probeläufe parallel auf dem rayon-Pool auswerten
    pub parallel_trials: bool,
    /// Obergrenze für die Anzahl der Probeläufe
    pub trial_limit: Option<usize>,
}

impl PackingConfig {
    pub const DEFAULT_WEIGHTED: bool = true;
    pub const DEFAULT_DIM_FACTOR: f64 = 1.0;
    pub const DEFAULT_EPSILON: f64 = 1e-6;
    pub const DEFAULT_PARALLEL_TRIALS: bool = false;

    /// Erstellt einen Builder für benutzerdefinierte Konfiguration.
    pub fn builder() -> PackingConfigBuilder {
        PackingConfigBuilder::default()
    }
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            weighted: Self::DEFAULT_WEIGHTED,
            dim_factor: Self::DEFAULT_DIM_FACTOR,
            epsilon: Self::DEFAULT_EPSILON,
            parallel_trials: Self::DEFAULT_PARALLEL_TRIALS,
            trial_limit: None,
        }
    }
}

/// Builder-Pattern für PackingConfig.
#[derive(Clone, Debug, Default)]
pub struct PackingConfigBuilder {
    config: PackingConfig,
}

impl PackingConfigBuilder {
    /// Schaltet den gewichteten Modus ein oder aus.
    pub fn weighted(mut self, weighted: bool) -> Self {
        self.config.weighted = weighted;
        self
    }

    /// Setzt den Divisor für das dimensionale Gewicht.
    pub fn dim_factor(mut self, factor: f64) -> Self {
        self.config.dim_factor = factor;
        self
    }

    /// Setzt die allgemeine Toleranz.
    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.config.epsilon = epsilon;
        self
    }

    /// Aktiviert die parallele Auswertung der Probeläufe.
    pub fn parallel_trials(mut self, parallel: bool) -> Self {
        self.config.parallel_trials = parallel;
        self
    }

    /// Begrenzt die Anzahl der Probeläufe.
    pub fn trial_limit(mut self, limit: Option<usize>) -> Self {
        self.config.trial_limit = limit;
        self
    }

    /// Erstellt die finale Konfiguration.
    pub fn build(self) -> PackingConfig {
        self.config
    }
}

/// Ergebnis der Verpackungsberechnung.
#[derive(Clone, Debug, PartialEq)]
pub struct PackingResult {
    pub container: Container,
    /// Platzierte Einheiten im Koordinatensystem des Containers
    pub packed: Vec<PackedItem>,
    /// Eine Einheit pro nicht platziertem Stück (Menge jeweils 1)
    pub unpacked: Vec<ItemType>,
    pub total_weight: f64,
    /// Anzahl ausgewerteter Probeläufe
    pub trials: usize,
    /// Index der gewählten Container-Orientierung
    pub orientation: Option<usize>,
    /// Start-Schichtdicke des gewählten Laufs
    pub layer_thickness: Option<f64>,
}

impl PackingResult {
    /// Gibt an, ob alle Einheiten verpackt wurden.
    pub fn is_complete(&self) -> bool {
        self.unpacked.is_empty()
    }

    pub fn packed_count(&self) -> usize {
        self.packed.len()
    }

    pub fn unpacked_count(&self) -> usize {
        self.unpacked.len()
    }

    /// Summe der Volumina aller platzierten Einheiten.
    pub fn packed_volume(&self) -> f64 {
        self.packed.iter().map(PackedItem::volume).sum()
    }

    /// Volumenauslastung des Containers in Prozent.
    pub fn utilization_percent(&self) -> f64 {
        let volume = self.container.volume();
        if volume <= 0.0 {
            return 0.0;
        }
        (self.packed_volume() / volume) * 100.0
    }
}

/// Ereignisse, die während des Packens auftreten, um Live-Visualisierung zu ermöglichen.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "type")]
pub enum PackEvent {
    /// Ein Probelauf wurde ausgewertet.
    TrialEvaluated {
        orientation: usize,
        layer_thickness: f64,
        packed_volume: f64,
        packed_weight: f64,
    },
    /// Eine Einheit wurde im gewählten Lauf platziert.
    ItemPlaced {
        id: String,
        pos: (f64, f64, f64),
        dims: (f64, f64, f64),
        weight: f64,
        total_weight: f64,
    },
    /// Packen abgeschlossen.
    Finished {
        packed: usize,
        unpacked: usize,
        total_weight: f64,
    },
}

/// Ein Probelauf: Orientierung plus Start-Schichtdicke.
#[derive(Clone, Copy, Debug, PartialEq)]
struct TrialPlan {
    orientation: ContainerOrientation,
    thickness: f64,
}

/// Bisher bester Probelauf.
#[derive(Clone, Copy, Debug)]
struct BestTrial {
    plan: Option<TrialPlan>,
    volume: f64,
    deviation: f64,
}

impl BestTrial {
    fn new() -> Self {
        Self {
            plan: None,
            volume: 0.0,
            deviation: f64::MAX,
        }
    }

    /// Übernimmt den Lauf, wenn er mehr Volumen packt oder, im gewichteten
    /// Modus, näher am dimensionalen Gewicht liegt. Beide Kriterien werden
    /// unabhängig voneinander geprüft.
    fn offer(&mut self, plan: TrialPlan, volume: f64, deviation: f64, config: &PackingConfig) {
        let more_volume = volume > self.volume + config.epsilon;
        let closer_weight = config.weighted && self.deviation > deviation + config.epsilon;
        if more_volume || closer_weight {
            self.plan = Some(plan);
            self.volume = volume;
            self.deviation = deviation;
        }
    }
}

/// Hauptfunktion zur Beladung eines Containers.
///
/// # Parameter
/// * `container` - Der zu beladende Container
/// * `items` - Katalog der Stückgut-Typen mit Mengen
///
/// # Rückgabewert
/// `PackingResult` mit platzierten und nicht platzierten Einheiten
pub fn pack(container: &Container, items: &[ItemType]) -> PackingResult {
    pack_with_config(container, items, PackingConfig::default())
}

/// Verpackung mit benutzerdefinierter Konfiguration.
///
/// Wie `pack`, aber mit anpassbaren Parametern.
pub fn pack_with_config(container: &Container, items: &[ItemType], config: PackingConfig) -> PackingResult {
    pack_with_progress(container, items, config, |_| {})
}

/// Verpackung mit benutzerdefinierter Konfiguration und Live-Progress Callback.
///
/// Ruft für jeden Probelauf, jede Platzierung des gewählten Laufs und zum
/// Abschluss ein Callback auf (geeignet für SSE).
pub fn pack_with_progress(
    container: &Container,
    items: &[ItemType],
    config: PackingConfig,
    mut on_event: impl FnMut(&PackEvent),
) -> PackingResult {
    let problem = PackingProblem::new(container, items, &config);
    let dimensional_weight = problem.dimensional_weight();
    let plans = trial_plans(&problem, &config);
    debug!(trials = plans.len(), "evaluating trials");

    let mut best = BestTrial::new();
    let mut trials = 0;
    let mut evaluate = |plan: TrialPlan, outcome: &RunOutcome| -> bool {
        trials += 1;
        let deviation = (outcome.packed_weight - dimensional_weight).abs();
        debug!(
            orientation = plan.orientation.index(),
            thickness = plan.thickness,
            volume = outcome.packed_volume,
            weight = outcome.packed_weight,
            "trial evaluated"
        );
        on_event(&PackEvent::TrialEvaluated {
            orientation: plan.orientation.index(),
            layer_thickness: plan.thickness,
            packed_volume: outcome.packed_volume,
            packed_weight: outcome.packed_weight,
        });
        best.offer(plan, outcome.packed_volume, deviation, &config);
        outcome.full
    };

    if config.parallel_trials {
        let outcomes: Vec<RunOutcome> = plans
            .par_iter()
            .map(|plan| run(&problem, *plan, RunMode::Trial))
            .collect();
        for (plan, outcome) in plans.iter().zip(&outcomes) {
            if evaluate(*plan, outcome) {
                break;
            }
        }
    } else {
        for plan in &plans {
            let outcome = run(&problem, *plan, RunMode::Trial);
            if evaluate(*plan, &outcome) {
                break;
            }
        }
    }

    let committed = match best.plan {
        Some(plan) if best.volume > 0.0 => Some((plan, run(&problem, plan, RunMode::Commit))),
        _ => None,
    };

    let result = assemble_result(container, items, committed, trials, &mut on_event);
    info!(
        container = %container.id,
        packed = result.packed_count(),
        unpacked = result.unpacked_count(),
        utilization = result.utilization_percent(),
        trials = result.trials,
        "packing finished"
    );
    result
}

/// Listet alle Probeläufe in Auswertungsreihenfolge.
fn trial_plans(problem: &PackingProblem<'_>, config: &PackingConfig) -> Vec<TrialPlan> {
    let dims = problem.container.dims_as_vec3();
    let plans = ContainerOrientation::candidates_for(dims)
        .into_iter()
        .flat_map(|orientation| {
            let bin = orientation.to_local(dims);
            candidate_layers(bin, problem.items, problem.epsilon)
                .into_iter()
                .map(move |layer| TrialPlan {
                    orientation,
                    thickness: layer.thickness,
                })
        });

    match config.trial_limit {
        Some(limit) => plans.take(limit).collect(),
        None => plans.collect(),
    }
}

fn run(problem: &PackingProblem<'_>, plan: TrialPlan, mode: RunMode) -> RunOutcome {
    LayerBuilder::new(problem, plan.orientation, mode).run(plan.thickness)
}

/// Baut das Ergebnis aus dem aufgezeichneten Lauf.
///
/// Ohne Lauf bleibt jede Einheit des Katalogs unverpackt.
fn assemble_result(
    container: &Container,
    items: &[ItemType],
    committed: Option<(TrialPlan, RunOutcome)>,
    trials: usize,
    on_event: &mut impl FnMut(&PackEvent),
) -> PackingResult {
    let mut packed = Vec::new();
    let mut total_weight = 0.0;

    let (remaining, plan) = match committed {
        Some((plan, outcome)) => {
            for placement in &outcome.placements {
                let item = &items[placement.item];
                total_weight += item.weight;
                let packed_item = PackedItem {
                    id: item.id.clone(),
                    dims: item.dims,
                    weight: item.weight,
                    position: placement.position.as_tuple(),
                    packed_dims: placement.packed_dims.as_tuple(),
                };
                on_event(&PackEvent::ItemPlaced {
                    id: packed_item.id.clone(),
                    pos: packed_item.position,
                    dims: packed_item.packed_dims,
                    weight: packed_item.weight,
                    total_weight,
                });
                packed.push(packed_item);
            }
            (outcome.remaining, Some(plan))
        }
        None => (items.iter().map(|item| item.quantity).collect(), None),
    };

    let unpacked: Vec<ItemType> = items
        .iter()
        .zip(remaining)
        .flat_map(|(item, left)| (0..left).map(move |_| item.single_unit()))
        .collect();

    on_event(&PackEvent::Finished {
        packed: packed.len(),
        unpacked: unpacked.len(),
        total_weight,
    });

    PackingResult {
        container: container.clone(),
        packed,
        unpacked,
        total_weight,
        trials,
        orientation: plan.map(|s| s.orientation.index()),
        layer_thickness: plan.map(|s| s.thickness),
    }
}
