use sqlx::FromRow;

/// A row of the `sensors` table.
///
/// `active` is stored as an INTEGER; this service only ever writes 0 or 1.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Sensor {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub active: i64,
}

/// Rows inserted when the `sensors` table is first created.
pub const SEED_SENSORS: [(i64, &str, &str, i64); 3] = [
    (1, "Motion sensor 1", "IR motion sensor in location x.", 1),
    (2, "Accelerometer X", "X-axis accelerometer.", 0),
    (3, "Accelerometer Y", "Y-axis accelerometer.", 0),
];

impl Sensor {
    pub fn seeds() -> Vec<Sensor> {
        SEED_SENSORS
            .iter()
            .map(|&(id, name, description, active)| Sensor {
                id,
                name: name.to_owned(),
                description: description.to_owned(),
                active,
            })
            .collect()
    }
}
