//! Column names shared across stages.

pub const STAY_ID: &str = "stay_id";
pub const HADM_ID: &str = "hadm_id";
pub const SUBJECT_ID: &str = "subject_id";
pub const HOUR_BIN: &str = "hour_bin";

pub const AGE: &str = "age";
pub const GENDER: &str = "gender";
pub const ADMISSION_TYPE: &str = "admission_type";
pub const WEIGHT_KG: &str = "weight_kg";
pub const ICU_READMISSION: &str = "icu_readmission";
pub const ELIXHAUSER_SCORE: &str = "elixhauser_score";

pub const HEART_RATE: &str = "heart_rate";
pub const SBP: &str = "sbp";
pub const MBP: &str = "mbp";
pub const RESP_RATE: &str = "resp_rate";
pub const TEMP_C: &str = "temp_c";
pub const FIO2: &str = "fio2";
pub const GCS_EYE: &str = "gcs_eye";
pub const GCS_VERBAL: &str = "gcs_verbal";
pub const GCS_MOTOR: &str = "gcs_motor";
pub const GCS_TOTAL: &str = "gcs_total";

pub const PAO2: &str = "pao2";
pub const CREATININE: &str = "creatinine";
pub const PLATELET: &str = "platelet";
pub const BILIRUBIN_TOTAL: &str = "bilirubin_total";
pub const WBC: &str = "wbc";
pub const BICARBONATE: &str = "bicarbonate";

pub const URINE_OUTPUT: &str = "urine_output";
pub const CRYSTALLOID_ML: &str = "crystalloid_ml";

pub const TOTAL_VASO_EQUIV: &str = "total_vaso_equiv";
pub const SOFA_RESPIRATORY: &str = "sofa_respiratory";
pub const SOFA_CARDIOVASCULAR: &str = "sofa_cardiovascular";
pub const SOFA_RENAL: &str = "sofa_renal";
pub const SOFA_NEUROLOGICAL: &str = "sofa_neurological";
pub const SOFA_COAGULATION: &str = "sofa_coagulation";
pub const SOFA_HEPATIC: &str = "sofa_hepatic";
pub const SOFA_SCORE: &str = "sofa_score";
pub const SIRS_SCORE: &str = "sirs_score";
pub const SHOCK_INDEX: &str = "shock_index";
pub const PF_RATIO: &str = "pf_ratio";
pub const MECHANICAL_VENTILATION: &str = "mechanical_ventilation";
pub const CUMULATIVE_FLUID_BALANCE: &str = "cumulative_fluid_balance";
pub const HCO3: &str = "hco3";

pub const SOFA_COMPONENTS: [&str; 6] = [
    SOFA_RESPIRATORY,
    SOFA_CARDIOVASCULAR,
    SOFA_RENAL,
    SOFA_NEUROLOGICAL,
    SOFA_COAGULATION,
    SOFA_HEPATIC,
];
