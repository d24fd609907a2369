//! Synthetic welding-cell data.
//!
//! Produces a week (by default) of robot events and quality checks that
//! look like a real line: four events per cycle, the odd ERROR with or
//! without a RESET, an 8% NOK rate. Larger datasets get a few planted
//! data-quality problems (duplicated rows, blank timestamps) so the cleaner
//! has something to do.

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::{Rng, SeedableRng};
use time::{Duration, OffsetDateTime};
use weldline_core::{Event, EventType, QualityCheck, QualityResult, RawEvent, RawQualityCheck};

const CYCLES_PER_DAY: usize = 60;
const QUALITY_REASONS: [&str; 5] = [
    "porosity",
    "spatter",
    "lack_of_fusion",
    "burn_through",
    "dimension_fail",
];

/// Datasets above this many event rows get planted DQ problems.
const DQ_INJECTION_MIN_ROWS: usize = 100;
const INJECTED_DUPLICATES: usize = 10;
const INJECTED_BLANK_TS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GenConfig {
    pub days: u32,
    pub cells: u32,
    pub robots_per_cell: u32,
    pub seed: u64,
}

impl Default for GenConfig {
    fn default() -> Self {
        GenConfig {
            days: 7,
            cells: 3,
            robots_per_cell: 2,
            seed: 42,
        }
    }
}

/// Raw rows ready to be written as CSV.
#[derive(Debug, Clone)]
pub(crate) struct Dataset {
    pub events: Vec<RawEvent>,
    pub quality: Vec<RawQualityCheck>,
}

/// Normal sample via Box-Muller.
fn normal(rng: &mut StdRng, mean: f64, std_dev: f64) -> f64 {
    let u1 = 1.0 - rng.gen::<f64>();
    let u2 = rng.gen::<f64>();
    mean + std_dev * (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

fn error_code(rng: &mut StdRng) -> String {
    if rng.gen::<f64>() < 0.6 {
        format!("CDD{}", rng.gen_range(1..6))
    } else {
        format!("GLC_STOERUNG_{}", rng.gen_range(10..99))
    }
}

struct JobIds<'a> {
    cell_id: &'a str,
    robot_id: &'a str,
    job_id: &'a str,
    program_id: &'a str,
}

impl JobIds<'_> {
    fn event(&self, ts: OffsetDateTime, event_type: EventType, error_code: Option<String>) -> Event {
        Event {
            ts,
            cell_id: self.cell_id.to_string(),
            robot_id: self.robot_id.to_string(),
            job_id: self.job_id.to_string(),
            program_id: self.program_id.to_string(),
            event_type,
            error_code,
        }
    }
}

struct CycleTimings {
    cycle: i64,
    arc_delay: i64,
    arc_on: i64,
}

fn cycle_timings(rng: &mut StdRng) -> CycleTimings {
    let cycle = (normal(rng, 90.0, 18.0) as i64).clamp(25, 180);
    let arc_delay = normal(rng, 8.0, 3.0).max(1.0) as i64;
    let arc_on = normal(rng, 45.0, 12.0).max(5.0) as i64;
    let arc_on = arc_on.min(cycle - arc_delay - 5).max(8);
    CycleTimings {
        cycle,
        arc_delay,
        arc_on,
    }
}

/// Generate a dataset covering `cfg.days` days up to `end`.
///
/// The output depends only on `cfg` and `end`.
pub(crate) fn generate(cfg: &GenConfig, end: OffsetDateTime) -> Dataset {
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let start = end - Duration::days(i64::from(cfg.days));

    let mut events: Vec<Event> = Vec::new();
    let mut quality: Vec<RawQualityCheck> = Vec::new();
    let mut job_counter = 1u64;

    for day in 0..cfg.days {
        let day_start = start + Duration::days(i64::from(day));
        for cell in 1..=cfg.cells {
            let cell_id = format!("C{:02}", cell);
            for robot in 1..=cfg.robots_per_cell {
                let robot_id = format!("R{:02}", robot);
                for _ in 0..CYCLES_PER_DAY {
                    let job_id = format!("JOB{:07}", job_counter);
                    job_counter += 1;

                    let ts0 = day_start + Duration::minutes(rng.gen_range(0..24 * 60));
                    let t = cycle_timings(&mut rng);
                    let program_id = format!("P{:03}", rng.gen_range(1..26));

                    let job = JobIds {
                        cell_id: &cell_id,
                        robot_id: &robot_id,
                        job_id: &job_id,
                        program_id: &program_id,
                    };

                    events.push(job.event(ts0, EventType::StartCycle, None));
                    events.push(job.event(
                        ts0 + Duration::seconds(t.arc_delay),
                        EventType::ArcOn,
                        None,
                    ));
                    events.push(job.event(
                        ts0 + Duration::seconds(t.arc_delay + t.arc_on),
                        EventType::ArcOff,
                        None,
                    ));
                    events.push(job.event(
                        ts0 + Duration::seconds(t.cycle),
                        EventType::EndCycle,
                        None,
                    ));

                    if rng.gen::<f64>() < 0.06 {
                        let err_ts = ts0 + Duration::seconds(rng.gen_range(5..t.cycle - 2));
                        let code = error_code(&mut rng);
                        events.push(job.event(err_ts, EventType::Error, Some(code)));
                        if rng.gen::<f64>() < 0.5 {
                            let reset_ts = err_ts + Duration::seconds(rng.gen_range(5..45));
                            events.push(job.event(reset_ts, EventType::Reset, None));
                        }
                    }

                    let nok = rng.gen::<f64>() < 0.08;
                    let reason = if nok {
                        QUALITY_REASONS.choose(&mut rng).map(|r| r.to_string())
                    } else {
                        None
                    };
                    let rework = nok && rng.gen::<f64>() < 0.35;
                    let check = QualityCheck {
                        job_id: job_id.clone(),
                        cell_id: cell_id.clone(),
                        robot_id: robot_id.clone(),
                        program_id: program_id.clone(),
                        result: if nok {
                            QualityResult::Nok
                        } else {
                            QualityResult::Ok
                        },
                        reason,
                        rework_needed: Some(rework),
                    };
                    quality.push(check.to_raw());
                }
            }
        }
    }

    let mut blank = vec![false; events.len()];
    if events.len() > DQ_INJECTION_MIN_ROWS {
        let picked = index::sample(&mut rng, events.len(), INJECTED_DUPLICATES);
        let duplicates: Vec<Event> = picked.iter().map(|i| events[i].clone()).collect();
        events.extend(duplicates);
        blank.resize(events.len(), false);

        for i in index::sample(&mut rng, events.len(), INJECTED_BLANK_TS).iter() {
            blank[i] = true;
        }
    }

    // Cycles that start late on the last day can spill past `end`.
    let events = events
        .iter()
        .zip(blank)
        .filter(|(e, blank)| *blank || (e.ts >= start && e.ts <= end))
        .map(|(e, blank)| {
            let mut raw = e.to_raw();
            if blank {
                raw.ts = None;
            }
            raw
        })
        .collect();

    Dataset { events, quality }
}
