//! Derived clinical features computed from the imputed hourly frame.

use icustate_common::{f64_column, i32_column};
use icustate_model::ConversionFactor;
use icustate_model::columns::{
    BICARBONATE, BILIRUBIN_TOTAL, CREATININE, CRYSTALLOID_ML, CUMULATIVE_FLUID_BALANCE, FIO2,
    GCS_TOTAL, HCO3, HEART_RATE, MBP, MECHANICAL_VENTILATION, PAO2, PF_RATIO, PLATELET, RESP_RATE,
    SBP, SHOCK_INDEX, SIRS_SCORE, SOFA_CARDIOVASCULAR, SOFA_COAGULATION, SOFA_HEPATIC,
    SOFA_NEUROLOGICAL, SOFA_RENAL, SOFA_RESPIRATORY, SOFA_SCORE, TEMP_C, TOTAL_VASO_EQUIV,
    URINE_OUTPUT, WBC,
};
use tracing::info;

use crate::error::Result;
use crate::fill::prefix_sum;
use crate::frame::HourlyFrame;
use crate::scores;

/// Static inputs of the derivation stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivationConfig {
    /// Dose columns and their weight in the vasopressor equivalent.
    pub vasopressors: Vec<ConversionFactor>,
}

impl DerivationConfig {
    pub fn new(vasopressors: Vec<ConversionFactor>) -> Self {
        Self { vasopressors }
    }
}

/// Adds the vasopressor equivalent, SOFA and SIRS scores, shock index, PF
/// ratio, ventilation flag, cumulative fluid balance and `hco3`.
///
/// Existing columns with the same names are replaced. The frame is sorted
/// by key before the fluid balance prefix sum.
pub fn derive_features(frame: HourlyFrame, config: &DerivationConfig) -> Result<HourlyFrame> {
    let frame = frame.sort_by_key()?;
    let rows = frame.height();
    let partitions = frame.partitions()?;
    let read = |name: &str| frame.f64_or_null(name);

    let mut vaso = vec![0.0; rows];
    for agent in &config.vasopressors {
        for (total, dose) in vaso.iter_mut().zip(read(agent.feature.as_str())?) {
            *total += dose.unwrap_or(0.0) * agent.factor;
        }
    }

    let heart_rate = read(HEART_RATE)?;
    let sbp = read(SBP)?;
    let mbp = read(MBP)?;
    let resp_rate = read(RESP_RATE)?;
    let temp_c = read(TEMP_C)?;
    let fio2 = read(FIO2)?;
    let pao2 = read(PAO2)?;
    let creatinine = read(CREATININE)?;
    let platelet = read(PLATELET)?;
    let bilirubin = read(BILIRUBIN_TOTAL)?;
    let wbc = read(WBC)?;
    let gcs = read(GCS_TOTAL)?;

    let mut sofa: [Vec<Option<i32>>; 6] = Default::default();
    let mut sofa_total = Vec::with_capacity(rows);
    let mut sirs = Vec::with_capacity(rows);
    let mut shock = Vec::with_capacity(rows);
    let mut pf = Vec::with_capacity(rows);
    let mut ventilated = Vec::with_capacity(rows);

    for row in 0..rows {
        let ratio = scores::pf_ratio(pao2[row], fio2[row]);
        let vent = scores::mechanical_ventilation(fio2[row]);
        let parts = [
            scores::sofa_respiratory(ratio, vent),
            scores::sofa_cardiovascular(Some(vaso[row]), mbp[row]),
            scores::sofa_renal(creatinine[row]),
            scores::sofa_neurological(gcs[row]),
            scores::sofa_coagulation(platelet[row]),
            scores::sofa_hepatic(bilirubin[row]),
        ];
        for (column, part) in sofa.iter_mut().zip(parts) {
            column.push(Some(part));
        }
        sofa_total.push(Some(parts.iter().sum::<i32>()));
        sirs.push(Some(scores::sirs(
            temp_c[row],
            heart_rate[row],
            resp_rate[row],
            wbc[row],
        )));
        shock.push(scores::shock_index(heart_rate[row], sbp[row]));
        pf.push(ratio);
        ventilated.push(Some(i32::from(vent)));
    }

    let net: Vec<f64> = read(CRYSTALLOID_ML)?
        .into_iter()
        .zip(read(URINE_OUTPUT)?)
        .map(|(fluid_in, fluid_out)| fluid_in.unwrap_or(0.0) - fluid_out.unwrap_or(0.0))
        .collect();
    let balance = prefix_sum(&net, &partitions);

    let [resp, cardio, renal, neuro, coag, hepatic] = sofa;
    let derived = vec![
        f64_column(TOTAL_VASO_EQUIV, vaso.into_iter().map(Some).collect()),
        i32_column(SOFA_RESPIRATORY, resp),
        i32_column(SOFA_CARDIOVASCULAR, cardio),
        i32_column(SOFA_RENAL, renal),
        i32_column(SOFA_NEUROLOGICAL, neuro),
        i32_column(SOFA_COAGULATION, coag),
        i32_column(SOFA_HEPATIC, hepatic),
        i32_column(SOFA_SCORE, sofa_total),
        i32_column(SIRS_SCORE, sirs),
        f64_column(SHOCK_INDEX, shock),
        f64_column(PF_RATIO, pf),
        i32_column(MECHANICAL_VENTILATION, ventilated),
        f64_column(CUMULATIVE_FLUID_BALANCE, balance.into_iter().map(Some).collect()),
        f64_column(HCO3, read(BICARBONATE)?),
    ];

    let mut data = frame.data().clone();
    for column in derived {
        data.with_column(column)?;
    }
    info!(rows, columns = data.width(), "derived features computed");
    frame.with_data(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use icustate_common::{f64_values, i32_values, i64_column};
    use icustate_model::MILLIS_PER_HOUR;
    use icustate_model::columns::{HOUR_BIN, STAY_ID};
    use polars::prelude::{Column, DataFrame};

    fn frame(keys: &[(i64, i64)], columns: Vec<Column>) -> HourlyFrame {
        let mut all = vec![
            i64_column(STAY_ID, keys.iter().map(|k| Some(k.0)).collect()),
            i64_column(HOUR_BIN, keys.iter().map(|k| Some(k.1 * MILLIS_PER_HOUR)).collect()),
        ];
        all.extend(columns);
        HourlyFrame::new("imputed", DataFrame::new(all).unwrap()).unwrap()
    }

    fn config() -> DerivationConfig {
        DerivationConfig::new(vec![
            ConversionFactor::new("norepinephrine_dose", 1.0),
            ConversionFactor::new("vasopressin_dose", 0.4),
        ])
    }

    #[test]
    fn pf_ratio_and_ventilation_from_percent_fio2() {
        let df = frame(
            &[(1, 0)],
            vec![
                f64_column(FIO2, vec![Some(40.0)]),
                f64_column(PAO2, vec![Some(80.0)]),
            ],
        );
        let out = derive_features(df, &config()).unwrap();
        assert_eq!(f64_values(out.data(), PF_RATIO).unwrap(), vec![Some(200.0)]);
        assert_eq!(i32_values(out.data(), MECHANICAL_VENTILATION).unwrap(), vec![Some(1)]);
        assert_eq!(i32_values(out.data(), SOFA_RESPIRATORY).unwrap(), vec![Some(3)]);
    }

    #[test]
    fn vaso_equivalent_weights_doses() {
        let df = frame(
            &[(1, 0), (1, 1)],
            vec![
                f64_column("norepinephrine_dose", vec![Some(0.2), None]),
                f64_column("vasopressin_dose", vec![Some(1.0), Some(0.5)]),
            ],
        );
        let out = derive_features(df, &config()).unwrap();
        let vaso = f64_values(out.data(), TOTAL_VASO_EQUIV).unwrap();
        assert!((vaso[0].unwrap() - 0.6).abs() < 1e-9);
        assert!((vaso[1].unwrap() - 0.2).abs() < 1e-9);
        assert_eq!(
            i32_values(out.data(), SOFA_CARDIOVASCULAR).unwrap(),
            vec![Some(4), Some(3)]
        );
    }

    #[test]
    fn fluid_balance_is_a_per_stay_prefix_sum_after_sorting() {
        let df = frame(
            &[(2, 0), (1, 1), (1, 0), (2, 1)],
            vec![
                f64_column(CRYSTALLOID_ML, vec![Some(100.0), Some(500.0), Some(1000.0), None]),
                f64_column(URINE_OUTPUT, vec![None, Some(200.0), Some(100.0), Some(50.0)]),
            ],
        );
        let out = derive_features(df, &config()).unwrap();
        assert_eq!(
            f64_values(out.data(), CUMULATIVE_FLUID_BALANCE).unwrap(),
            vec![Some(900.0), Some(1200.0), Some(100.0), Some(50.0)]
        );
    }

    #[test]
    fn sofa_total_is_sum_of_components_and_absent_inputs_score_zero() {
        let df = frame(
            &[(1, 0), (1, 1)],
            vec![
                f64_column(CREATININE, vec![Some(3.6), None]),
                f64_column(PLATELET, vec![Some(40.0), None]),
                f64_column(GCS_TOTAL, vec![Some(8.0), None]),
                f64_column(MBP, vec![Some(60.0), None]),
                f64_column(BICARBONATE, vec![Some(22.0), None]),
            ],
        );
        let out = derive_features(df, &config()).unwrap();
        assert_eq!(i32_values(out.data(), SOFA_SCORE).unwrap(), vec![Some(10), Some(0)]);
        assert_eq!(f64_values(out.data(), HCO3).unwrap(), vec![Some(22.0), None]);
        assert_eq!(f64_values(out.data(), SHOCK_INDEX).unwrap(), vec![None, None]);
        assert_eq!(i32_values(out.data(), SIRS_SCORE).unwrap(), vec![Some(0), Some(0)]);
    }
}
