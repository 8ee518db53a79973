//! Raw tables consumed by the pipeline and the columns each must provide.

/// A raw input table identified by its file stem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    pub required: bool,
}

pub const ICUSTAYS: TableSpec = TableSpec {
    name: "icustays",
    columns: &["subject_id", "hadm_id", "stay_id", "intime", "outtime"],
    required: true,
};

pub const CHARTEVENTS: TableSpec = TableSpec {
    name: "chartevents",
    columns: &["stay_id", "itemid", "charttime", "valuenum"],
    required: false,
};

pub const LABEVENTS: TableSpec = TableSpec {
    name: "labevents",
    columns: &["subject_id", "hadm_id", "itemid", "charttime", "valuenum"],
    required: false,
};

pub const OUTPUTEVENTS: TableSpec = TableSpec {
    name: "outputevents",
    columns: &["stay_id", "itemid", "charttime", "value"],
    required: false,
};

pub const INPUTEVENTS: TableSpec = TableSpec {
    name: "inputevents",
    columns: &["stay_id", "itemid", "starttime", "amount"],
    required: false,
};

pub const DIAGNOSES_ICD: TableSpec = TableSpec {
    name: "diagnoses_icd",
    columns: &["hadm_id", "icd_code", "icd_version"],
    required: false,
};

pub const PATIENTS: TableSpec = TableSpec {
    name: "patients",
    columns: &["subject_id", "gender", "anchor_age"],
    required: false,
};

pub const ADMISSIONS: TableSpec = TableSpec {
    name: "admissions",
    columns: &["hadm_id", "admission_type"],
    required: false,
};

/// Outpatient measurements, used for the body weight fallback.
pub const OMR: TableSpec = TableSpec {
    name: "omr",
    columns: &["subject_id", "chartdate", "result_name", "result_value"],
    required: false,
};

pub const ALL: [TableSpec; 9] = [
    ICUSTAYS,
    CHARTEVENTS,
    LABEVENTS,
    OUTPUTEVENTS,
    INPUTEVENTS,
    DIAGNOSES_ICD,
    PATIENTS,
    ADMISSIONS,
    OMR,
];

pub fn by_name(name: &str) -> Option<TableSpec> {
    ALL.into_iter().find(|t| t.name == name)
}
