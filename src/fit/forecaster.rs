//! Additive model fitting and prediction.
//!
//! Given observations `(ds_i, y_i)` the model is
//!
//! ```text
//! y(t) = g(t) + Σ_s f_s(t) + ε
//! ```
//!
//! with a piecewise-linear trend `g` and Fourier seasonal terms `f_s`. All
//! coefficients enter linearly, so one penalised least squares solve (SVD)
//! fits the whole model. Time and `y` are scaled before fitting so the default
//! prior scales behave the same for any input units.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use nalgebra::{DMatrix, DVector};
use tracing::{debug, info};

use crate::domain::{
    FittedSeasonality, Forecast, ForecastConfig, ForecastRow, Frequency, ModelFile, Observation, SeasonalitySpec,
    TrendParams,
};
use crate::error::AppError;
use crate::fit::horizon::future_dates;
use crate::fit::uncertainty::{SimulationInput, simulate_intervals};
use crate::math::{days_since_epoch, solve_penalized};
use crate::models::{
    SeasonalBlock, SeasonalityRegistry, TREND_BASE_COLS, changepoint_locations, fill_trend_row, layout_blocks,
    piecewise_linear, resolve_builtin,
};

/// An unfitted model: configuration plus the custom seasonality registry.
#[derive(Debug, Clone)]
pub struct Forecaster {
    config: ForecastConfig,
    registry: SeasonalityRegistry,
}

impl Forecaster {
    /// Build a forecaster and register the configured custom seasonalities.
    pub fn new(config: ForecastConfig) -> Result<Self, AppError> {
        validate_config(&config)?;
        let mut registry = SeasonalityRegistry::new();
        for spec in &config.seasonalities {
            registry.add(spec.clone())?;
        }
        Ok(Self { config, registry })
    }

    /// Register an additional seasonal term before fitting.
    pub fn add_seasonality(&mut self, spec: SeasonalitySpec) -> Result<(), AppError> {
        self.registry.add(spec)
    }

    /// Drop a custom seasonal term before fitting.
    pub fn remove_seasonality(&mut self, name: &str) -> Option<SeasonalitySpec> {
        self.registry.remove(name)
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn seasonalities(&self) -> &SeasonalityRegistry {
        &self.registry
    }

    /// Fit the model on the observations with a defined `y`.
    ///
    /// Observations must be unique by `ds`. Rows with a missing `y` are kept
    /// as history dates (they get a forecast) but do not influence the fit.
    pub fn fit(&self, observations: &[Observation]) -> Result<FittedModel, AppError> {
        let mut history_dates: Vec<NaiveDate> = observations.iter().map(|o| o.ds).collect();
        history_dates.sort();
        if let Some(w) = history_dates.windows(2).find(|w| w[0] == w[1]) {
            return Err(AppError::input(format!("Duplicate `ds` value {} in history.", w[0])));
        }

        let mut train: Vec<(NaiveDate, f64)> = observations
            .iter()
            .filter_map(|o| o.y.filter(|y| y.is_finite()).map(|y| (o.ds, y)))
            .collect();
        train.sort_by_key(|(ds, _)| *ds);

        let (Some(&(ds_start, _)), Some(&(ds_end, _))) = (train.first(), train.last()) else {
            return Err(AppError::no_data("No observations with a numeric `y` to fit."));
        };

        let span_days = (ds_end - ds_start).num_days() as f64;
        let t_scale_days = if span_days > 0.0 { span_days } else { 1.0 };
        let y_scale = {
            let m = train.iter().map(|(_, y)| y.abs()).fold(0.0, f64::max);
            if m > 0.0 { m } else { 1.0 }
        };

        let t_hist: Vec<f64> = train
            .iter()
            .map(|(ds, _)| (*ds - ds_start).num_days() as f64 / t_scale_days)
            .collect();
        let y_scaled: Vec<f64> = train.iter().map(|(_, y)| y / y_scale).collect();
        let train_dates: Vec<NaiveDate> = train.iter().map(|(ds, _)| *ds).collect();

        let changepoints = changepoint_locations(&t_hist, self.config.n_changepoints, self.config.changepoint_range);

        // Built-ins first, then custom terms, as one registry of fitted terms.
        let mut fitted_registry = SeasonalityRegistry::new();
        for spec in resolve_builtin(&self.config, &self.registry, &train_dates) {
            fitted_registry.add(spec)?;
        }
        for spec in self.registry.iter() {
            fitted_registry.add(spec.clone())?;
        }
        let blocks = layout_blocks(
            fitted_registry.iter().cloned().collect(),
            TREND_BASE_COLS + changepoints.len(),
        );

        let n = train.len();
        let p = blocks.last().map(|b| b.end).unwrap_or(TREND_BASE_COLS + changepoints.len());
        debug!(
            rows = n,
            cols = p,
            changepoints = changepoints.len(),
            seasonalities = blocks.len(),
            "building design matrix"
        );

        let mut x = DMatrix::<f64>::zeros(n, p);
        let mut row = vec![0.0; p];
        let trend_cols = TREND_BASE_COLS + changepoints.len();
        for i in 0..n {
            fill_trend_row(t_hist[i], &changepoints, &mut row[..trend_cols]);
            let t_days = days_since_epoch(train_dates[i]);
            for block in &blocks {
                block.fill_row(t_days, &mut row);
            }
            for j in 0..p {
                x[(i, j)] = row[j];
            }
        }
        let y = DVector::from_row_slice(&y_scaled);

        let mut prior_scales: Vec<Option<f64>> = vec![None; TREND_BASE_COLS];
        prior_scales.extend(std::iter::repeat(Some(self.config.changepoint_prior_scale)).take(changepoints.len()));
        for block in &blocks {
            prior_scales.extend(std::iter::repeat(Some(block.spec.prior_scale)).take(block.width()));
        }

        let beta = solve_penalized(&x, &y, &prior_scales)
            .ok_or_else(|| AppError::fit("Least squares solve failed (design matrix too ill-conditioned)."))?;
        let coefficients: Vec<f64> = beta.iter().copied().collect();

        let trend = TrendParams {
            m: coefficients[0],
            k: coefficients[1],
            changepoints_t: changepoints.clone(),
            deltas: coefficients[TREND_BASE_COLS..trend_cols].to_vec(),
        };

        let fitted = &x * &beta;
        let sse: f64 = fitted.iter().zip(y.iter()).map(|(f, o)| (o - f) * (o - f)).sum();
        let sigma_obs = (sse / n as f64).sqrt();
        if !sigma_obs.is_finite() {
            return Err(AppError::fit("Non-finite residual scale after fitting."));
        }

        info!(
            rows = n,
            seasonalities = ?blocks.iter().map(|b| b.spec.name.as_str()).collect::<Vec<_>>(),
            rmse = sigma_obs * y_scale,
            "model fitted"
        );

        Ok(FittedModel {
            config: self.config.clone(),
            history_dates,
            ds_start,
            ds_end,
            t_scale_days,
            y_scale,
            trend,
            coefficients,
            blocks,
            registry: fitted_registry,
            sigma_obs,
        })
    }
}

fn validate_config(config: &ForecastConfig) -> Result<(), AppError> {
    if !(config.interval_width.is_finite() && config.interval_width > 0.0 && config.interval_width < 1.0) {
        return Err(AppError::input(format!(
            "Interval width must be in (0, 1), got {}.",
            config.interval_width
        )));
    }
    if !(config.changepoint_prior_scale.is_finite() && config.changepoint_prior_scale > 0.0) {
        return Err(AppError::input("Changepoint prior scale must be positive."));
    }
    if !(config.seasonality_prior_scale.is_finite() && config.seasonality_prior_scale > 0.0) {
        return Err(AppError::input("Seasonality prior scale must be positive."));
    }
    if !(0.0..=1.0).contains(&config.changepoint_range) {
        return Err(AppError::input("Changepoint range must be in [0, 1]."));
    }
    Ok(())
}

/// A fitted model, ready to predict.
#[derive(Debug, Clone)]
pub struct FittedModel {
    config: ForecastConfig,
    /// Every observation date, including rows with a missing `y`.
    history_dates: Vec<NaiveDate>,
    ds_start: NaiveDate,
    ds_end: NaiveDate,
    t_scale_days: f64,
    y_scale: f64,
    trend: TrendParams,
    coefficients: Vec<f64>,
    blocks: Vec<SeasonalBlock>,
    /// Terms that were fitted. Editing it does not change `blocks`.
    registry: SeasonalityRegistry,
    sigma_obs: f64,
}

impl FittedModel {
    /// History dates followed by `periods` future dates at `freq` spacing.
    pub fn make_future_dates(
        &self,
        periods: usize,
        freq: Frequency,
        include_history: bool,
    ) -> Result<Vec<NaiveDate>, AppError> {
        let Some(&last) = self.history_dates.last() else {
            return Err(AppError::no_data("Model has no history dates."));
        };
        let mut out = if include_history {
            self.history_dates.clone()
        } else {
            Vec::new()
        };
        out.extend(future_dates(last, periods, freq)?);
        Ok(out)
    }

    /// Predict `yhat`, intervals and components for each date.
    ///
    /// Dates are sorted and de-duplicated; the output has one row per distinct date.
    pub fn predict(&self, dates: &[NaiveDate]) -> Result<Forecast, AppError> {
        let mut dates = dates.to_vec();
        dates.sort();
        dates.dedup();

        let t: Vec<f64> = dates.iter().map(|d| self.scaled_time(*d)).collect();

        let mut components: Vec<BTreeMap<String, f64>> = Vec::with_capacity(dates.len());
        let mut seasonal_scaled = Vec::with_capacity(dates.len());
        for d in &dates {
            let t_days = days_since_epoch(*d);
            let mut parts = BTreeMap::new();
            let mut sum = 0.0;
            for block in &self.blocks {
                let v = block.contribution(t_days, &self.coefficients);
                sum += v;
                parts.insert(block.spec.name.clone(), v * self.y_scale);
            }
            seasonal_scaled.push(sum);
            components.push(parts);
        }

        let bands = simulate_intervals(
            SimulationInput {
                trend: &self.trend,
                sigma_obs: self.sigma_obs,
                t: &t,
                seasonal: &seasonal_scaled,
                y_scale: self.y_scale,
            },
            self.config.interval_width,
            self.config.uncertainty_samples,
            self.config.seed,
        )?;

        let mut rows = Vec::with_capacity(dates.len());
        for (i, (ds, parts)) in dates.into_iter().zip(components).enumerate() {
            let trend = piecewise_linear(
                t[i],
                self.trend.k,
                self.trend.m,
                &self.trend.changepoints_t,
                &self.trend.deltas,
            ) * self.y_scale;
            let additive_terms = seasonal_scaled[i] * self.y_scale;
            let yhat = trend + additive_terms;
            if !yhat.is_finite() {
                return Err(AppError::fit(format!("Non-finite prediction at {ds}.")));
            }
            rows.push(ForecastRow {
                ds,
                yhat,
                yhat_lower: bands.yhat_lower[i],
                yhat_upper: bands.yhat_upper[i],
                trend,
                trend_lower: bands.trend_lower[i],
                trend_upper: bands.trend_upper[i],
                additive_terms,
                components: parts,
            });
        }

        Ok(Forecast {
            rows,
            component_names: self.component_names(),
        })
    }

    /// Names of the fitted seasonal components, in fit order.
    pub fn component_names(&self) -> Vec<String> {
        self.blocks.iter().map(|b| b.spec.name.clone()).collect()
    }

    /// The registry of fitted terms.
    pub fn seasonalities(&self) -> &SeasonalityRegistry {
        &self.registry
    }

    /// Remove a term from the registry.
    ///
    /// Prediction is driven by the seasonal blocks captured at fit time, so
    /// this does not change `predict` output. Refit to drop a component.
    pub fn remove_seasonality(&mut self, name: &str) -> Option<SeasonalitySpec> {
        self.registry.remove(name)
    }

    pub fn history_dates(&self) -> &[NaiveDate] {
        &self.history_dates
    }

    pub fn sigma_obs(&self) -> f64 {
        self.sigma_obs * self.y_scale
    }

    pub fn trend_params(&self) -> &TrendParams {
        &self.trend
    }

    /// Serializable snapshot of the fitted parameters.
    pub fn to_model_file(&self) -> ModelFile {
        ModelFile {
            tool: "sunspot".to_string(),
            ds_start: self.ds_start,
            ds_end: self.ds_end,
            y_scale: self.y_scale,
            sigma_obs: self.sigma_obs(),
            trend: self.trend.clone(),
            seasonalities: self
                .blocks
                .iter()
                .map(|b| FittedSeasonality {
                    spec: b.spec.clone(),
                    coefficients: self.coefficients[b.start..b.end].to_vec(),
                })
                .collect(),
        }
    }

    fn scaled_time(&self, d: NaiveDate) -> f64 {
        (d - self.ds_start).num_days() as f64 / self.t_scale_days
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DAYS_PER_YEAR, SUNSPOT_CYCLE, SeasonalityToggle, Variant};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn annual_cycle(years: i32) -> Vec<Observation> {
        (0..years)
            .map(|i| {
                let phase = 2.0 * std::f64::consts::PI * i as f64 / 11.0;
                Observation {
                    ds: d(1900 + i, 7, 1),
                    y: Some(80.0 + 60.0 * phase.sin() + 0.2 * i as f64),
                }
            })
            .collect()
    }

    fn quick_config(variant: Variant) -> ForecastConfig {
        let mut config = ForecastConfig::for_variant(variant, 11.0, 5);
        config.uncertainty_samples = 200;
        config
    }

    #[test]
    fn fits_the_solar_cycle() {
        let obs = annual_cycle(120);
        let model = Forecaster::new(quick_config(Variant::CycleOnly)).unwrap().fit(&obs).unwrap();
        assert_eq!(model.component_names(), vec![SUNSPOT_CYCLE.to_string()]);

        let forecast = model.predict(model.history_dates()).unwrap();
        let rmse = (forecast
            .rows
            .iter()
            .zip(&obs)
            .map(|(r, o)| (o.y.unwrap() - r.yhat).powi(2))
            .sum::<f64>()
            / obs.len() as f64)
            .sqrt();
        assert!(rmse < 10.0, "rmse too large: {rmse}");

        for r in &forecast.rows {
            let parts: f64 = r.components.values().sum();
            assert!((r.yhat - (r.trend + parts)).abs() < 1e-9);
            assert!((r.additive_terms - parts).abs() < 1e-9);
            assert!(r.yhat_lower <= r.yhat_upper);
        }
    }

    #[test]
    fn two_points_yield_history_plus_thirty_years() {
        let obs = vec![
            Observation { ds: d(2020, 1, 1), y: Some(10.0) },
            Observation { ds: d(2021, 1, 1), y: Some(15.0) },
        ];
        let model = Forecaster::new(quick_config(Variant::CycleOnly)).unwrap().fit(&obs).unwrap();
        let dates = model.make_future_dates(30, Frequency::YearEnd, true).unwrap();
        let forecast = model.predict(&dates).unwrap();
        assert!(forecast.len() >= 32);
        assert_eq!(forecast.rows[0].ds, d(2020, 1, 1));
        assert_eq!(forecast.rows[2].ds, d(2021, 12, 31));
    }

    #[test]
    fn single_observation_still_forecasts() {
        let obs = vec![Observation { ds: d(2000, 1, 1), y: Some(42.0) }];
        let model = Forecaster::new(quick_config(Variant::CycleOnly)).unwrap().fit(&obs).unwrap();
        let dates = model.make_future_dates(30, Frequency::YearEnd, true).unwrap();
        let forecast = model.predict(&dates).unwrap();
        assert_eq!(forecast.len(), 31);
        assert_eq!(forecast.rows[0].ds, d(2000, 1, 1));
        assert!(forecast.rows.iter().all(|r| r.yhat.is_finite()));
    }

    #[test]
    fn removing_yearly_after_fit_does_not_change_predictions() {
        let obs = annual_cycle(60);
        let model = Forecaster::new(quick_config(Variant::DefaultSeasonality))
            .unwrap()
            .fit(&obs)
            .unwrap();
        assert!(model.seasonalities().contains("yearly"));

        let dates = model.make_future_dates(30, Frequency::YearEnd, true).unwrap();
        let before = model.predict(&dates).unwrap();

        let mut edited = model.clone();
        assert!(edited.remove_seasonality("yearly").is_some());
        assert!(!edited.seasonalities().contains("yearly"));
        let after = edited.predict(&dates).unwrap();

        assert_eq!(before, after);
    }

    #[test]
    fn refit_is_deterministic() {
        let obs = annual_cycle(40);
        let forecaster = Forecaster::new(quick_config(Variant::CycleOnly)).unwrap();
        let a = forecaster.fit(&obs).unwrap();
        let b = forecaster.fit(&obs).unwrap();
        let dates = a.make_future_dates(10, Frequency::YearEnd, true).unwrap();
        assert_eq!(a.predict(&dates).unwrap(), b.predict(&dates).unwrap());
    }

    #[test]
    fn missing_y_rows_stay_in_history_dates() {
        let mut obs = annual_cycle(20);
        obs[5].y = None;
        let model = Forecaster::new(quick_config(Variant::CycleOnly)).unwrap().fit(&obs).unwrap();
        assert_eq!(model.history_dates().len(), 20);
    }

    #[test]
    fn rejects_duplicates_and_empty_training_sets() {
        let forecaster = Forecaster::new(quick_config(Variant::CycleOnly)).unwrap();
        let dup = vec![
            Observation { ds: d(2000, 1, 1), y: Some(1.0) },
            Observation { ds: d(2000, 1, 1), y: Some(2.0) },
        ];
        assert_eq!(forecaster.fit(&dup).unwrap_err().exit_code(), AppError::INPUT);

        let empty = vec![Observation { ds: d(2000, 1, 1), y: None }];
        assert_eq!(forecaster.fit(&empty).unwrap_err().exit_code(), AppError::NO_DATA);
    }

    #[test]
    fn forced_off_toggles_leave_only_custom_terms() {
        let mut config = quick_config(Variant::DefaultSeasonality);
        config.yearly_seasonality = SeasonalityToggle::Off;
        let model = Forecaster::new(config).unwrap().fit(&annual_cycle(30)).unwrap();
        assert_eq!(model.component_names(), vec![SUNSPOT_CYCLE.to_string()]);
    }

    #[test]
    fn invalid_interval_width_is_rejected() {
        let mut config = ForecastConfig::default();
        config.interval_width = 1.5;
        assert!(Forecaster::new(config).is_err());
    }

    #[test]
    fn added_term_is_fitted_and_collisions_are_rejected() {
        let mut forecaster = Forecaster::new(quick_config(Variant::CycleOnly)).unwrap();

        let clash = SeasonalitySpec::sunspot_cycle(10.0, 3, 10.0);
        assert_eq!(forecaster.add_seasonality(clash).unwrap_err().exit_code(), AppError::INPUT);
        let cycle = forecaster.seasonalities().get(SUNSPOT_CYCLE).unwrap();
        assert_eq!(cycle.fourier_order, 5);

        let gleissberg = SeasonalitySpec::new("gleissberg", 88.0 * DAYS_PER_YEAR, 2, 10.0);
        forecaster.add_seasonality(gleissberg).unwrap();
        assert_eq!(forecaster.seasonalities().len(), 2);

        let model = forecaster.fit(&annual_cycle(120)).unwrap();
        assert_eq!(
            model.component_names(),
            vec![SUNSPOT_CYCLE.to_string(), "gleissberg".to_string()]
        );
        let forecast = model.predict(model.history_dates()).unwrap();
        assert!(!forecast.is_empty());
        assert!(forecast.rows.iter().all(|r| r.component("gleissberg").is_some()));
    }

    #[test]
    fn removing_before_fit_drops_the_term() {
        let mut forecaster = Forecaster::new(quick_config(Variant::CycleOnly)).unwrap();
        assert_eq!(forecaster.config().seasonalities.len(), 1);

        let removed = forecaster.remove_seasonality(SUNSPOT_CYCLE).unwrap();
        assert_eq!(removed.name, SUNSPOT_CYCLE);
        assert!(forecaster.remove_seasonality(SUNSPOT_CYCLE).is_none());

        let model = forecaster.fit(&annual_cycle(30)).unwrap();
        assert!(model.component_names().is_empty());
        let forecast = model.predict(model.history_dates()).unwrap();
        assert!(forecast.rows.iter().all(|r| r.additive_terms == 0.0));
    }

    #[test]
    fn exported_noise_scale_is_in_y_units() {
        let model = Forecaster::new(quick_config(Variant::CycleOnly))
            .unwrap()
            .fit(&annual_cycle(60))
            .unwrap();
        let file = model.to_model_file();
        assert_eq!(file.sigma_obs, model.sigma_obs());
        assert!(file.y_scale > 1.0);
    }
}
