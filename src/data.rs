use std::error::Error;
use std::io;

use nalgebra::SVector;

use crate::error::FilterError;
use crate::utils::state::GaussianState;

/// Reads one measurement per CSV row. Lines starting with `#` are skipped.
pub fn read_measurements<R: io::Read, const Z: usize>(
    reader: R,
) -> Result<Vec<SVector<f64, Z>>, Box<dyn Error>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut measurements = Vec::new();
    for (row, record) in reader.deserialize::<Vec<f64>>().enumerate() {
        let values = record?;
        if values.len() != Z {
            let what = format!("measurement row {}", row + 1);
            return Err(FilterError::dimension_mismatch(what, Z, values.len()).into());
        }
        measurements.push(SVector::from_column_slice(&values));
    }
    Ok(measurements)
}

/// Writes `step, x_0..x_n, std_0..std_n` rows with a header.
pub fn write_estimates<W: io::Write, const S: usize>(
    writer: W,
    estimates: &[GaussianState<f64, S>],
) -> Result<(), Box<dyn Error>> {
    let mut writer = csv::Writer::from_writer(writer);

    let mut header = vec!["step".to_owned()];
    header.extend((0..S).map(|i| format!("x{i}")));
    header.extend((0..S).map(|i| format!("std{i}")));
    writer.write_record(&header)?;

    for (step, estimate) in estimates.iter().enumerate() {
        let mut record = vec![(step + 1).to_string()];
        record.extend(estimate.x.iter().map(|v| v.to_string()));
        record.extend(estimate.std_dev().iter().map(|v| v.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Matrix2, Vector2};

    #[test]
    fn read_measurement_rows() -> Result<(), Box<dyn Error>> {
        let log = "# range, bearing\n10.0, 0.5\n11.5,0.25\n";
        let rows = read_measurements::<_, 2>(log.as_bytes())?;
        assert_eq!(rows, vec![Vector2::new(10.0, 0.5), Vector2::new(11.5, 0.25)]);
        Ok(())
    }

    #[test]
    fn short_row_is_rejected() {
        let err = read_measurements::<_, 2>("1.0,2.0\n3.0\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("measurement row 2"));
    }

    #[test]
    fn write_estimate_rows() -> Result<(), Box<dyn Error>> {
        let estimates = [GaussianState::new(
            Vector2::new(1.5, -2.0),
            Matrix2::new(4.0, 0.0, 0.0, 0.25),
        )];
        let mut out = Vec::new();
        write_estimates(&mut out, &estimates)?;
        let text = String::from_utf8(out)?;
        assert_eq!(text, "step,x0,x1,std0,std1\n1,1.5,-2,2,0.5\n");
        Ok(())
    }
}
