//! Submission file writing
//!
//! The template supplies the id column and the class column headers; the
//! class columns are overwritten with predicted probabilities.

use ndarray::Array2;
use std::path::Path;
use tracing::info;

use super::table::RawTable;
use crate::error::{Error, Result};

/// Fill the class columns of `template` from `probabilities`.
///
/// `class_names[j]` names the template column that receives column `j` of
/// the probability matrix. The template's `id_column` must list `ids` in
/// the same order as the prediction rows.
pub fn fill_submission(
    mut template: RawTable,
    id_column: &str,
    ids: &[String],
    class_names: &[String],
    probabilities: &Array2<f64>,
) -> Result<RawTable> {
    if probabilities.ncols() != class_names.len() {
        return Err(Error::shape(
            format!("{} probability columns", class_names.len()),
            probabilities.ncols(),
        ));
    }
    let template_ids = template.column(id_column)?;
    if probabilities.nrows() != template.n_rows() {
        return Err(Error::shape(
            format!("{} template rows", template.n_rows()),
            format!("{} prediction rows", probabilities.nrows()),
        ));
    }
    if ids.len() != template_ids.len() {
        return Err(Error::SchemaMismatch(format!(
            "template has {} ids, test data has {}",
            template_ids.len(),
            ids.len()
        )));
    }
    if let Some((row, (found, expected))) = template_ids
        .iter()
        .zip(ids)
        .enumerate()
        .find(|(_, (found, expected))| found.map(str::trim) != Some(expected.trim()))
    {
        return Err(Error::SchemaMismatch(format!(
            "{} in template row {} is {:?}, expected {:?}",
            id_column, row, found, expected
        )));
    }

    for (j, class) in class_names.iter().enumerate() {
        let values = probabilities
            .column(j)
            .iter()
            .map(|p| Some(p.to_string()))
            .collect();
        template.set_column(class, values)?;
    }
    Ok(template)
}

/// Read the template, fill it and write the result to `output`
pub fn write_submission<P: AsRef<Path>, Q: AsRef<Path>>(
    template_path: P,
    output: Q,
    id_column: &str,
    ids: &[String],
    class_names: &[String],
    probabilities: &Array2<f64>,
) -> Result<()> {
    let template = RawTable::from_csv(template_path)?;
    let filled = fill_submission(template, id_column, ids, class_names, probabilities)?;
    filled.to_csv(&output)?;
    info!(
        "wrote {} rows to {}",
        filled.n_rows(),
        output.as_ref().display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    const TEMPLATE: &str = "ID,Adoption,Died,Euthanasia,Return_to_owner,Transfer\n\
                            1,1,0,0,0,0\n\
                            2,1,0,0,0,0\n";

    fn classes() -> Vec<String> {
        ["Adoption", "Died", "Euthanasia", "Return_to_owner", "Transfer"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn ids(n: usize) -> Vec<String> {
        (1..=n).map(|i| i.to_string()).collect()
    }

    #[test]
    fn test_fill_by_class_name() {
        let template = RawTable::from_reader(TEMPLATE.as_bytes()).unwrap();
        let probs = array![[0.2, 0.0, 0.1, 0.2, 0.5], [0.5, 0.0, 0.0, 0.25, 0.25]];
        let filled = fill_submission(template, "ID", &ids(2), &classes(), &probs).unwrap();

        assert_eq!(filled.column("ID").unwrap(), vec![Some("1"), Some("2")]);
        assert_eq!(filled.column("Transfer").unwrap(), vec![Some("0.5"), Some("0.25")]);
        assert_eq!(filled.column("Adoption").unwrap(), vec![Some("0.2"), Some("0.5")]);
    }

    #[test]
    fn test_row_count_mismatch() {
        let template = RawTable::from_reader(TEMPLATE.as_bytes()).unwrap();
        let probs = Array2::from_elem((3, 5), 0.2);
        assert!(matches!(
            fill_submission(template, "ID", &ids(2), &classes(), &probs),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_class_column() {
        let template = RawTable::from_reader("ID,Adoption\n1,0\n".as_bytes()).unwrap();
        let probs = array![[0.5, 0.5]];
        let names = vec!["Adoption".to_string(), "Died".to_string()];
        assert!(matches!(
            fill_submission(template, "ID", &ids(1), &names, &probs),
            Err(Error::MissingColumn(_))
        ));
    }

    #[test]
    fn test_missing_id_column() {
        let template = RawTable::from_reader("Adoption,Died\n1,0\n".as_bytes()).unwrap();
        let probs = array![[0.5, 0.5]];
        let names = vec!["Adoption".to_string(), "Died".to_string()];
        assert!(matches!(
            fill_submission(template, "ID", &ids(1), &names, &probs),
            Err(Error::MissingColumn(_))
        ));
    }

    #[test]
    fn test_ids_must_match_test_rows() {
        let template = RawTable::from_reader(TEMPLATE.as_bytes()).unwrap();
        let probs = Array2::from_elem((2, 5), 0.2);
        let swapped = vec!["2".to_string(), "1".to_string()];
        assert!(matches!(
            fill_submission(template, "ID", &swapped, &classes(), &probs),
            Err(Error::SchemaMismatch(_))
        ));
    }
}
