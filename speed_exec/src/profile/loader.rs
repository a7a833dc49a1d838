//! Loading of speed profiles from CSV files

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, warn};
use std::io::Read;
use std::path::Path;

// Internal
use super::{
    ProfileError, ProfileParams, ProfileSample, ProfileTable, RECOMMENDED_NUM_SAMPLES,
};

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ProfileTable {
    /// Load a profile from a headered CSV file.
    ///
    /// Speeds are converted from the unit declared in `params` to meters/second.
    pub fn from_csv<P: AsRef<Path>>(path: P, params: &ProfileParams) -> Result<Self, ProfileError> {
        let rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path.as_ref())
            .map_err(ProfileError::ReadError)?;

        let table = Self::from_csv_reader(rdr, params)?;

        info!(
            "Loaded profile {:?}: {} samples over {:.02} s",
            path.as_ref(),
            table.len(),
            table.end_time_s() - table.start_time_s()
        );

        Ok(table)
    }

    /// Load a profile from any reader yielding headered CSV.
    pub fn from_reader<R: Read>(reader: R, params: &ProfileParams) -> Result<Self, ProfileError> {
        let rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        Self::from_csv_reader(rdr, params)
    }

    fn from_csv_reader<R: Read>(
        mut rdr: csv::Reader<R>,
        params: &ProfileParams,
    ) -> Result<Self, ProfileError> {
        // Find the columns we need
        let headers = rdr.headers().map_err(ProfileError::ReadError)?.clone();
        let time_idx = column_index(&headers, &params.time_column)?;
        let speed_idx = column_index(&headers, &params.speed_column)?;

        let mut samples = Vec::new();

        for (row, record) in rdr.records().enumerate() {
            let record = record.map_err(ProfileError::ReadError)?;

            let time_s = parse_field(&record, time_idx, row, &params.time_column)?;
            let speed = parse_field(&record, speed_idx, row, &params.speed_column)?;

            samples.push(ProfileSample::new(time_s, params.speed_unit.to_ms(speed)));
        }

        if samples.len() < RECOMMENDED_NUM_SAMPLES {
            warn!(
                "Profile only has {} samples, at least {} are recommended",
                samples.len(),
                RECOMMENDED_NUM_SAMPLES
            );
        }

        Ok(ProfileTable::new(samples)?)
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize, ProfileError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| ProfileError::MissingColumn(name.to_string()))
}

fn parse_field(
    record: &csv::StringRecord,
    idx: usize,
    row: usize,
    column: &str,
) -> Result<f64, ProfileError> {
    let value = record.get(idx).unwrap_or("");

    value.parse().map_err(|_| ProfileError::InvalidValue {
        row,
        column: column.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod test {
    use super::super::{InvalidProfile, SpeedUnit};
    use super::*;

    #[test]
    fn test_load_mph() {
        let csv = "time,speed\n0,0\n1,10\n2,20\n";
        let t = ProfileTable::from_reader(csv.as_bytes(), &ProfileParams::with_unit(SpeedUnit::Mph))
            .unwrap();

        assert_eq!(t.len(), 3);
        assert_eq!(t.end_time_s(), 2.0);
        assert!((t.lookup(1.0) - 4.4704).abs() < 1e-12);
    }

    #[test]
    fn test_load_extra_columns_and_whitespace() {
        let csv = "note, t , v\nstart, 0.0, 1.5\nmid, 0.5 , 2.5\nend, 1.0, 0.0\n";
        let params = ProfileParams {
            speed_unit: SpeedUnit::Mps,
            time_column: "t".into(),
            speed_column: "v".into(),
        };

        let t = ProfileTable::from_reader(csv.as_bytes(), &params).unwrap();
        assert_eq!(t.speeds(), &[1.5, 2.5, 0.0]);
    }

    #[test]
    fn test_load_errors() {
        let params = ProfileParams::with_unit(SpeedUnit::Mps);

        assert!(matches!(
            ProfileTable::from_reader("time,velocity\n0,0\n1,1\n".as_bytes(), &params),
            Err(ProfileError::MissingColumn(c)) if c == "speed"
        ));

        assert!(matches!(
            ProfileTable::from_reader("time,speed\n0,0\n1,fast\n".as_bytes(), &params),
            Err(ProfileError::InvalidValue { row: 1, .. })
        ));

        assert!(matches!(
            ProfileTable::from_reader("time,speed\n0,0\n".as_bytes(), &params),
            Err(ProfileError::Invalid(InvalidProfile::TooFewSamples(1)))
        ));

        assert!(matches!(
            ProfileTable::from_reader("time,speed\n0,0\n2,1\n1,2\n".as_bytes(), &params),
            Err(ProfileError::Invalid(InvalidProfile::NonMonotonicTime { index: 2, .. }))
        ));

        assert!(matches!(
            ProfileTable::from_csv("does/not/exist.csv", &params),
            Err(ProfileError::ReadError(_))
        ));
    }
}
