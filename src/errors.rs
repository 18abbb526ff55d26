use thiserror::Error;

#[derive(Error, Debug)]
pub enum KineticaError {
    // Configuration errors
    #[error("Cutoff ratio {value} must be positive")]
    InvalidCutoff { value: f64 },

    #[error("List radius ratio {list} must exceed the cutoff ratio {cutoff}")]
    InvalidListRadius { list: f64, cutoff: f64 },

    #[error("Time step {value} must be positive")]
    InvalidTimeStep { value: f64 },

    #[error("Species id {id} out of range (total species: {n_species})")]
    UnknownSpecies { id: usize, n_species: usize },

    #[error("Species named '{name}' is not defined")]
    UnknownSpeciesName { name: String },

    #[error("Negative lattice spacing {spacing} not allowed")]
    NegativeSpacing { spacing: f64 },

    #[error("Atom index {index} out of range or removed (total slots: {n_atoms})")]
    InvalidAtomIndex { index: usize, n_atoms: usize },

    #[error("Body index {index} out of range or removed (total slots: {n_bodies})")]
    InvalidBodyIndex { index: usize, n_bodies: usize },

    #[error("Invalid value {value} for {name}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("Affinity for species {id} with itself cannot override sigma or epsilon")]
    DiagonalAffinityOverride { id: usize },

    // Bond errors
    #[error("Atoms {i} and {j} are already bonded")]
    DuplicateBond { i: usize, j: usize },

    #[error("Atom {i} cannot be bonded to itself")]
    SelfBond { i: usize },

    #[error("Angular bond needs a radial bond between atoms {i} and {j}")]
    MissingRadialBond { i: usize, j: usize },

    #[error("Snapshot column '{column}' has {len} entries, expected {expected}")]
    InconsistentSnapshot {
        column: &'static str,
        len: usize,
        expected: usize,
    },

    // Concurrency errors
    #[error("A force evaluation or step is already in progress")]
    EngineBusy,

    // Scenario errors
    #[error("Failed to open scenario file '{path}': {source}")]
    ScenarioFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse scenario file '{path}': {source}")]
    ScenarioParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

pub type Result<T> = std::result::Result<T, KineticaError>;
