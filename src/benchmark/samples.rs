/// Nomenclature items used when a benchmark is started without samples.
pub const DEFAULT_SAMPLES: &[&str] = &[
    "Bolt M8x20 DIN 933 zinc plated",
    "Nut M8 DIN 934",
    "Washer A2 M10 DIN 125",
    "Cable VVGng-LS 3x2.5",
    "Circuit breaker C16 1P 4.5kA",
    "Screwdriver PH2 150mm",
    "Paint enamel PF-115 white 2.7kg",
    "Copier paper A4 80g/m2 500 sheets",
    "Work gloves cotton with PVC dots",
    "Pipe PPR 20x3.4 PN20",
    "LED lamp E27 10W 4000K",
    "Drill bit HSS 6mm",
];

pub fn default_samples() -> Vec<String> {
    DEFAULT_SAMPLES.iter().map(|s| s.to_string()).collect()
}
