//! Clinical severity scores over one hourly row.
//!
//! Every component scores 0 when its input is missing.

/// FiO2 above this raw value marks an hour as ventilated. Applied to the raw
/// charted value, before any percent-to-fraction normalization.
pub const VENTILATION_FIO2_THRESHOLD: f64 = 21.0;

/// FiO2 as a fraction; values above 1 are percentages.
pub fn fio2_fraction(fio2: f64) -> f64 {
    if fio2 > 1.0 { fio2 / 100.0 } else { fio2 }
}

/// PaO2 / FiO2, null when either is missing or FiO2 is not positive.
pub fn pf_ratio(pao2: Option<f64>, fio2: Option<f64>) -> Option<f64> {
    match (pao2, fio2) {
        (Some(pao2), Some(fio2)) if fio2 > 0.0 => Some(pao2 / fio2_fraction(fio2)),
        _ => None,
    }
}

pub fn mechanical_ventilation(fio2: Option<f64>) -> bool {
    fio2.is_some_and(|f| f > VENTILATION_FIO2_THRESHOLD)
}

/// Heart rate / systolic pressure, null unless SBP is positive.
pub fn shock_index(heart_rate: Option<f64>, sbp: Option<f64>) -> Option<f64> {
    match (heart_rate, sbp) {
        (Some(hr), Some(sbp)) if sbp > 0.0 => Some(hr / sbp),
        _ => None,
    }
}

pub fn sofa_respiratory(pf: Option<f64>, ventilated: bool) -> i32 {
    match pf {
        None => 0,
        Some(pf) if pf <= 100.0 && ventilated => 4,
        Some(pf) if pf <= 200.0 && ventilated => 3,
        Some(pf) if pf <= 200.0 => 2,
        Some(pf) if pf <= 400.0 => 1,
        Some(_) => 0,
    }
}

/// Vasopressor load first, then hypotension.
pub fn sofa_cardiovascular(vaso_equiv: Option<f64>, mbp: Option<f64>) -> i32 {
    let vaso = vaso_equiv.unwrap_or(0.0);
    if vaso > 0.5 {
        4
    } else if vaso > 0.1 {
        3
    } else if vaso > 0.0 {
        2
    } else if mbp.is_some_and(|m| m < 70.0) {
        1
    } else {
        0
    }
}

pub fn sofa_renal(creatinine: Option<f64>) -> i32 {
    ascending(creatinine, [1.2, 2.0, 3.5, 5.0])
}

pub fn sofa_neurological(gcs_total: Option<f64>) -> i32 {
    match gcs_total {
        None => 0,
        Some(gcs) if gcs < 6.0 => 4,
        Some(gcs) if gcs <= 9.0 => 3,
        Some(gcs) if gcs <= 12.0 => 2,
        Some(gcs) if gcs <= 14.0 => 1,
        Some(_) => 0,
    }
}

pub fn sofa_coagulation(platelet: Option<f64>) -> i32 {
    descending(platelet, [150.0, 100.0, 50.0, 20.0])
}

pub fn sofa_hepatic(bilirubin: Option<f64>) -> i32 {
    ascending(bilirubin, [1.2, 2.0, 6.0, 12.0])
}

/// Number of met SIRS criteria.
pub fn sirs(
    temp_c: Option<f64>,
    heart_rate: Option<f64>,
    resp_rate: Option<f64>,
    wbc: Option<f64>,
) -> i32 {
    let criteria = [
        temp_c.is_some_and(|t| !(36.0..=38.0).contains(&t)),
        heart_rate.is_some_and(|hr| hr > 90.0),
        resp_rate.is_some_and(|rr| rr > 20.0),
        wbc.is_some_and(|w| !(4.0..=12.0).contains(&w)),
    ];
    criteria.into_iter().map(i32::from).sum()
}

/// One point per threshold reached (`value >= threshold`).
fn ascending(value: Option<f64>, thresholds: [f64; 4]) -> i32 {
    value.map_or(0, |v| thresholds.iter().map(|t| i32::from(v >= *t)).sum())
}

/// One point per threshold undercut (`value <= threshold`).
fn descending(value: Option<f64>, thresholds: [f64; 4]) -> i32 {
    value.map_or(0, |v| thresholds.iter().map(|t| i32::from(v <= *t)).sum())
}
