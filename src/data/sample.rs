//! Synthetic causal-impact inputs.
//!
//! A covariate follows a random walk and the target tracks it linearly plus
//! noise. From the post-period start on, a known lift is added to the target.
//! Because the counterfactual is known exactly, the same draw also yields an
//! evaluation table, so the plot pipeline can be exercised without a model.

use chrono::{Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{Column, IndexKey, Period, Periods, Scale, Statistic, TimeIndex, TimeSeriesTable};
use crate::error::{AppError, Result};
use crate::math::normal_critical_value;
use crate::plotdata::{EvaluationTable, column_name};

/// Covariate loading of the target.
const BETA: f64 = 1.5;
const INTERCEPT: f64 = 10.0;
const COVARIATE_START: f64 = 50.0;

#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub start: NaiveDate,
    pub n_pre: usize,
    pub n_post: usize,
    /// Lift added to the target over the post-period.
    pub effect: f64,
    pub noise_sd: f64,
    pub seed: u64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            n_pre: 70,
            n_post: 30,
            effect: 5.0,
            noise_sd: 1.0,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SampleData {
    /// Columns `y` (target) and `x1` (covariate), daily index.
    pub table: TimeSeriesTable,
    /// Target without the injected lift.
    pub counterfactual: Vec<f64>,
    pub periods: Periods,
    pub noise_sd: f64,
}

pub fn generate_sample(config: &SampleConfig) -> Result<SampleData> {
    if config.n_pre < 3 {
        return Err(AppError::InvalidArgument(format!(
            "Sample needs at least 3 pre-period steps. Got {}.",
            config.n_pre
        )));
    }
    if config.n_post == 0 {
        return Err(AppError::InvalidArgument("Sample needs at least 1 post-period step.".into()));
    }
    if !(config.noise_sd.is_finite() && config.noise_sd > 0.0) || !config.effect.is_finite() {
        return Err(AppError::InvalidArgument(
            "Sample noise must be finite and > 0, and the effect finite.".into(),
        ));
    }

    let n = config.n_pre + config.n_post;
    let dates = (0..n)
        .map(|i| {
            config
                .start
                .checked_add_signed(Duration::days(i as i64))
                .map(IndexKey::Date)
                .ok_or_else(|| AppError::InvalidArgument("Sample dates overflow the calendar.".into()))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let step = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::InvalidArgument(format!("Covariate distribution error: {e}")))?;
    let noise = Normal::new(0.0, config.noise_sd)
        .map_err(|e| AppError::InvalidArgument(format!("Noise distribution error: {e}")))?;

    let mut x = Vec::with_capacity(n);
    let mut counterfactual = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);
    let mut level = COVARIATE_START;
    for i in 0..n {
        level += step.sample(&mut rng);
        let base = INTERCEPT + BETA * level + noise.sample(&mut rng);
        let lift = if i >= config.n_pre { config.effect } else { 0.0 };
        x.push(Some(level));
        counterfactual.push(base);
        y.push(Some(base + lift));
    }

    let periods = Periods {
        pre: Period {
            start: dates[0],
            end: dates[config.n_pre - 1],
        },
        post: Period {
            start: dates[config.n_pre],
            end: dates[n - 1],
        },
    };
    let table = TimeSeriesTable::new(
        TimeIndex::new(dates)?,
        vec![Column::numeric("y", y), Column::numeric("x1", x)],
    )?;

    Ok(SampleData {
        table,
        counterfactual,
        periods,
        noise_sd: config.noise_sd,
    })
}

impl SampleData {
    /// Evaluation table an exact model would produce for this draw.
    ///
    /// The posterior mean is the counterfactual with std `noise_sd`; quantile
    /// bounds are the `alpha` normal interval. Cumulative effects start at the
    /// post-period and are missing before it.
    pub fn evaluation(&self, alpha: f64) -> Result<EvaluationTable> {
        let z = normal_critical_value(alpha)?;
        let sd = self.noise_sd;
        let keys = self.table.index().keys();
        let observed: Vec<f64> = self
            .table
            .column("y")
            .map(|c| c.observed())
            .ok_or_else(|| AppError::MissingColumn("y".into()))?;

        let mut columns: Vec<(Scale, Statistic, Vec<Option<f64>>)> = Vec::new();
        let mut push =
            |scale: Scale, stat: Statistic, values: Vec<Option<f64>>| columns.push((scale, stat, values));

        push(Scale::Original, Statistic::Observed, observed.iter().map(|v| Some(*v)).collect());
        let mean: Vec<f64> = self.counterfactual.clone();
        push_interval(&mut push, Scale::Original, &mean, &vec![sd; mean.len()], z);

        let point: Vec<f64> = observed.iter().zip(&mean).map(|(o, m)| o - m).collect();
        push_interval(&mut push, Scale::PointEffects, &point, &vec![sd; point.len()], z);

        let mut running = 0.0;
        let mut k = 0usize;
        let mut cum_mean = Vec::with_capacity(keys.len());
        let mut cum_sd = Vec::with_capacity(keys.len());
        for (key, p) in keys.iter().zip(&point) {
            if *key < self.periods.post.start {
                cum_mean.push(None);
                cum_sd.push(None);
            } else {
                running += p;
                k += 1;
                cum_mean.push(Some(running));
                cum_sd.push(Some(sd * (k as f64).sqrt()));
            }
        }
        let cum_lower = cum_mean.iter().zip(&cum_sd).map(|(m, s)| Some(m.as_ref()? - z * s.as_ref()?)).collect();
        let cum_upper = cum_mean.iter().zip(&cum_sd).map(|(m, s)| Some(m.as_ref()? + z * s.as_ref()?)).collect();
        push(Scale::CumulativeEffects, Statistic::Mean, cum_mean);
        push(Scale::CumulativeEffects, Statistic::Lower, cum_lower);
        push(Scale::CumulativeEffects, Statistic::Upper, cum_upper);
        push(Scale::CumulativeEffects, Statistic::Std, cum_sd);

        let columns = columns
            .into_iter()
            .map(|(scale, stat, values)| Column::numeric(column_name(scale, stat), values))
            .collect();
        EvaluationTable::new(self.table.index().clone(), columns, self.periods)
    }
}

fn push_interval(
    push: &mut impl FnMut(Scale, Statistic, Vec<Option<f64>>),
    scale: Scale,
    mean: &[f64],
    sd: &[f64],
    z: f64,
) {
    let lower = mean.iter().zip(sd).map(|(m, s)| Some(m - z * s)).collect();
    let upper = mean.iter().zip(sd).map(|(m, s)| Some(m + z * s)).collect();
    push(scale, Statistic::Mean, mean.iter().map(|v| Some(*v)).collect());
    push(scale, Statistic::Lower, lower);
    push(scale, Statistic::Upper, upper);
    push(scale, Statistic::Std, sd.iter().map(|v| Some(*v)).collect());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plotdata::build_plot_frame;

    #[test]
    fn same_seed_same_sample() {
        let a = generate_sample(&SampleConfig::default()).unwrap();
        let b = generate_sample(&SampleConfig::default()).unwrap();
        assert_eq!(a.counterfactual, b.counterfactual);
        let c = generate_sample(&SampleConfig {
            seed: 7,
            ..SampleConfig::default()
        })
        .unwrap();
        assert_ne!(a.counterfactual, c.counterfactual);
    }

    #[test]
    fn lift_is_applied_only_after_intervention() {
        let config = SampleConfig::default();
        let sample = generate_sample(&config).unwrap();
        let y = sample.table.column("y").unwrap().observed();
        for (i, (obs, cf)) in y.iter().zip(&sample.counterfactual).enumerate() {
            let lift = if i >= config.n_pre { config.effect } else { 0.0 };
            assert!((obs - cf - lift).abs() < 1e-12);
        }
        assert_eq!(sample.table.len(), config.n_pre + config.n_post);
    }

    #[test]
    fn evaluation_feeds_the_plot_frame() {
        let config = SampleConfig {
            n_pre: 5,
            n_post: 3,
            ..SampleConfig::default()
        };
        let sample = generate_sample(&config).unwrap();
        let eval = sample.evaluation(0.05).unwrap();
        let cum = eval.values(Scale::CumulativeEffects, Statistic::Mean).unwrap();
        assert_eq!(cum[4], None);
        assert!((cum[7].unwrap() - 3.0 * config.effect).abs() < 1e-9);

        let frame = build_plot_frame(&eval, 0.05).unwrap();
        // observed + 3 means over 8 steps; 2 band methods where bands exist
        let rows_without_band = frame.rows().iter().filter(|r| r.band_method.is_none()).count();
        assert_eq!(rows_without_band, 5);
        assert_eq!(frame.len(), 2 * 8 * 3 + 5 + 2 * 3);
    }

    #[test]
    fn rejects_short_pre_period() {
        let config = SampleConfig {
            n_pre: 2,
            ..SampleConfig::default()
        };
        assert!(matches!(generate_sample(&config), Err(AppError::InvalidArgument(_))));
    }
}
