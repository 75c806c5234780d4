//! Console grade printer.

use crate::models::{group_by_subject, Grade};

/// Format a point value without a trailing .0 for whole numbers.
fn format_points(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn format_grade(grade: &Grade) -> String {
    if grade.is_point_based() {
        let score = grade.grade_n.map(format_points).unwrap_or_else(|| "?".to_string());
        let max = grade.max_points.map(format_points).unwrap_or_else(|| "?".to_string());
        format!("{}/{}", score, max)
    } else {
        match grade.percent {
            Some(percent) => format!("{}%", format_points(percent)),
            None => grade
                .grade_n
                .map(format_points)
                .unwrap_or_else(|| "?".to_string()),
        }
    }
}

/// Print grades grouped by subject, one section per subject.
pub fn print_grades(grades: &[Grade]) {
    for (subject, items) in group_by_subject(grades) {
        println!("{}:", subject);
        for grade in &items {
            println!("    {} -> {}", grade.title, format_grade(grade));
        }
        println!("----------------");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_points() {
        assert_eq!(format_points(10.0), "10");
        assert_eq!(format_points(7.5), "7.5");
    }

    #[test]
    fn test_format_grade_point_based() {
        let grade = Grade {
            title: "Quiz".to_string(),
            subject_name: "Math".to_string(),
            grade_n: Some(8.0),
            max_points: Some(10.0),
            percent: None,
            date: None,
        };
        assert_eq!(format_grade(&grade), "8/10");
    }

    #[test]
    fn test_format_grade_percent() {
        let grade = Grade {
            title: "Test".to_string(),
            subject_name: "Math".to_string(),
            grade_n: Some(92.0),
            max_points: Some(100.0),
            percent: Some(92.0),
            date: None,
        };
        assert_eq!(format_grade(&grade), "92%");
    }
}
