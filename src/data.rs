use chrono::{Duration, Local, NaiveDateTime};
use csv::Reader;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{DataError, ValidationError};
use crate::models::{PerformanceMetrics, StudentRecord};

const FIRST_NAMES: [&str; 20] = [
    "Emma", "Liam", "Olivia", "Noah", "Ava", "Ethan", "Sophia", "Mason", "Isabella", "William",
    "Mia", "James", "Charlotte", "Benjamin", "Amelia", "Lucas", "Harper", "Henry", "Evelyn",
    "Alexander",
];

const LAST_NAMES: [&str; 20] = [
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson", "Thomas", "Taylor",
    "Moore", "Jackson", "Martin",
];

const SUBJECTS: [&str; 8] = [
    "Mathematics",
    "Physics",
    "Chemistry",
    "Biology",
    "English Literature",
    "History",
    "Geography",
    "Computer Science",
];

const SUBJECTS_PER_STUDENT: usize = 4;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One CSV row; list columns are `;`-separated.
#[derive(Debug, Deserialize)]
struct CsvStudentRow {
    id: i64,
    name: String,
    grade: f64,
    attendance: f64,
    #[serde(default)]
    subjects: String,
    homework_completion: f64,
    class_participation: f64,
    #[serde(default)]
    test_scores: String,
    last_updated: String,
}

impl CsvStudentRow {
    fn into_record(self) -> Result<StudentRecord, ValidationError> {
        let test_scores = split_list(&self.test_scores)
            .map(|raw| {
                raw.parse::<f64>().map_err(|_| ValidationError::NotNumeric {
                    id: self.id,
                    field: "test_scores",
                    value: raw.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(StudentRecord {
            id: self.id,
            name: self.name,
            grade: self.grade,
            attendance: self.attendance,
            subjects: split_list(&self.subjects).map(str::to_string).collect(),
            performance_metrics: PerformanceMetrics {
                homework_completion: self.homework_completion,
                class_participation: self.class_participation,
                test_scores,
            },
            last_updated: self.last_updated,
        })
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(';').map(str::trim).filter(|s| !s.is_empty())
}

/// Load and validate student records from a `.csv` or `.json` file.
pub fn load_students(path: &Path) -> Result<Vec<StudentRecord>, DataError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let file = std::fs::File::open(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let students = match extension.as_deref() {
        Some("csv") => students_from_csv(file, path)?,
        Some("json") => students_from_json(file, path)?,
        _ => return Err(DataError::UnsupportedFormat(path.to_path_buf())),
    };

    validate_records(&students)?;
    info!("Loaded {} student records from {}", students.len(), path.display());
    Ok(students)
}

pub fn students_from_csv<R: Read>(reader: R, origin: &Path) -> Result<Vec<StudentRecord>, DataError> {
    let mut rdr = Reader::from_reader(reader);
    let mut students = Vec::new();

    for result in rdr.deserialize::<CsvStudentRow>() {
        let row = result.map_err(|source| DataError::Csv {
            path: origin.to_path_buf(),
            source,
        })?;
        students.push(row.into_record()?);
    }

    Ok(students)
}

pub fn students_from_json<R: Read>(reader: R, origin: &Path) -> Result<Vec<StudentRecord>, DataError> {
    serde_json::from_reader(reader).map_err(|source| DataError::Json {
        path: origin.to_path_buf(),
        source,
    })
}

/// Reject the first record that breaks the boundary rules.
///
/// Ids must be unique, names non-blank, and every percentage a finite
/// value in 0-100.
pub fn validate_records(records: &[StudentRecord]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(records.len());

    for student in records {
        if !seen.insert(student.id) {
            return Err(ValidationError::DuplicateId { id: student.id });
        }
        if student.name.trim().is_empty() {
            return Err(ValidationError::EmptyName { id: student.id });
        }

        let metrics = &student.performance_metrics;
        check_percentage(student.id, "grade", student.grade)?;
        check_percentage(student.id, "attendance", student.attendance)?;
        check_percentage(student.id, "homework_completion", metrics.homework_completion)?;
        check_percentage(student.id, "class_participation", metrics.class_participation)?;
        for &score in &metrics.test_scores {
            check_percentage(student.id, "test_scores", score)?;
        }
    }

    debug!("Validated {} student records", records.len());
    Ok(())
}

fn check_percentage(id: i64, field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        Err(ValidationError::NotFinite { id, field })
    } else if !(0.0..=100.0).contains(&value) {
        Err(ValidationError::OutOfRange { id, field, value })
    } else {
        Ok(())
    }
}

/// Synthetic cohort for demos and local development.
///
/// With a seed the generated names and scores are reproducible; only
/// `last_updated` follows the wall clock.
pub fn generate_students(count: usize, seed: Option<u64>) -> Vec<StudentRecord> {
    generate_students_at(count, seed, Local::now().naive_local())
}

fn generate_students_at(count: usize, seed: Option<u64>, now: NaiveDateTime) -> Vec<StudentRecord> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    (1..=count)
        .map(|id| {
            let first = FIRST_NAMES.choose(&mut rng).copied().unwrap_or("Alex");
            let last = LAST_NAMES.choose(&mut rng).copied().unwrap_or("Doe");
            let grade = round1(rng.gen_range(60.0..=100.0));
            let attendance = round1(rng.gen_range(75.0..=100.0));
            let subjects = SUBJECTS
                .choose_multiple(&mut rng, SUBJECTS_PER_STUDENT)
                .map(|s| s.to_string())
                .collect();
            let homework_completion = round1(rng.gen_range(70.0..=100.0));
            let class_participation = round1(rng.gen_range(65.0..=100.0));
            let test_scores = (0..3).map(|_| round1(rng.gen_range(60.0..=100.0))).collect();
            let last_updated = (now - Duration::days(rng.gen_range(0..=7)))
                .format(TIMESTAMP_FORMAT)
                .to_string();

            StudentRecord {
                id: id as i64,
                name: format!("{first} {last}"),
                grade,
                attendance,
                subjects,
                performance_metrics: PerformanceMetrics {
                    homework_completion,
                    class_participation,
                    test_scores,
                },
                last_updated,
            }
        })
        .collect()
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;

    const CSV_HEADER: &str =
        "id,name,grade,attendance,subjects,homework_completion,class_participation,test_scores,last_updated\n";

    fn fixed_now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 16)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap()
    }

    #[test]
    fn test_csv_rows_become_records() {
        let csv = format!(
            "{CSV_HEADER}1,Emma Smith,91.5,97.0,Mathematics;Physics,88.0,90.0,90;85.5;93,2026-10-10 08:30:00\n\
             2,Liam Brown,64.0,71.0,,70.0,66.0,,2026-10-11 09:00:00\n"
        );
        let students = students_from_csv(csv.as_bytes(), Path::new("inline.csv")).unwrap();

        assert_eq!(students.len(), 2);
        assert_eq!(students[0].subjects, vec!["Mathematics", "Physics"]);
        assert_eq!(students[0].performance_metrics.test_scores, vec![90.0, 85.5, 93.0]);
        assert!(students[1].subjects.is_empty());
        assert!(students[1].performance_metrics.test_scores.is_empty());
    }

    #[test]
    fn test_csv_bad_test_score_names_record() {
        let csv = format!("{CSV_HEADER}9,Ava Jones,80,90,History,80,80,85;abc,2026-10-10 08:30:00\n");
        let err = students_from_csv(csv.as_bytes(), Path::new("inline.csv")).unwrap_err();

        match err {
            DataError::Validation(e) => assert_eq!(e.record_id(), 9),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_csv_non_numeric_grade_is_rejected() {
        let csv = format!("{CSV_HEADER}1,Ava Jones,high,90,History,80,80,85,2026-10-10 08:30:00\n");
        let err = students_from_csv(csv.as_bytes(), Path::new("inline.csv")).unwrap_err();
        assert!(matches!(err, DataError::Csv { .. }));
    }

    #[test]
    fn test_load_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        let body = serde_json::to_string(&generate_students_at(3, Some(7), fixed_now())).unwrap();
        file.write_all(body.as_bytes()).unwrap();

        let students = load_students(file.path()).unwrap();
        assert_eq!(students.len(), 3);
        assert_eq!(students[2].id, 3);
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        let err = load_students(file.path()).unwrap_err();
        assert!(matches!(err, DataError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_load_validates_records() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(
            file,
            "{CSV_HEADER}1,Emma Smith,91.5,97.0,Physics,88.0,90.0,90,2026-10-10 08:30:00\n\
             1,Noah Davis,71.0,87.0,Physics,80.0,80.0,75,2026-10-10 08:30:00\n"
        )
        .unwrap();

        let err = load_students(file.path()).unwrap_err();
        assert!(matches!(
            err,
            DataError::Validation(ValidationError::DuplicateId { id: 1 })
        ));
    }

    #[test]
    fn test_validation_checks_ranges_and_names() {
        let mut students = generate_students_at(2, Some(1), fixed_now());
        assert!(validate_records(&students).is_ok());

        students[1].attendance = 120.0;
        assert_eq!(
            validate_records(&students),
            Err(ValidationError::OutOfRange {
                id: 2,
                field: "attendance",
                value: 120.0
            })
        );

        students[1].attendance = 90.0;
        students[1].performance_metrics.test_scores.push(f64::NAN);
        assert_eq!(
            validate_records(&students),
            Err(ValidationError::NotFinite {
                id: 2,
                field: "test_scores"
            })
        );

        students[1].performance_metrics.test_scores.pop();
        students[0].name = "   ".to_string();
        assert_eq!(
            validate_records(&students),
            Err(ValidationError::EmptyName { id: 1 })
        );
    }

    #[test]
    fn test_generated_students_match_demo_ranges() {
        let students = generate_students_at(50, Some(42), fixed_now());

        assert_eq!(students.len(), 50);
        assert!(validate_records(&students).is_ok());
        for s in &students {
            assert!((60.0..=100.0).contains(&s.grade));
            assert!((75.0..=100.0).contains(&s.attendance));
            assert_eq!(s.subjects.len(), SUBJECTS_PER_STUDENT);
            let distinct: HashSet<_> = s.subjects.iter().collect();
            assert_eq!(distinct.len(), SUBJECTS_PER_STUDENT);
            assert_eq!(s.performance_metrics.test_scores.len(), 3);
            assert!(NaiveDateTime::parse_from_str(&s.last_updated, TIMESTAMP_FORMAT).is_ok());
        }
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let a = generate_students_at(10, Some(99), fixed_now());
        let b = generate_students_at(10, Some(99), fixed_now());
        assert_eq!(a, b);
    }
}
