//! Schema rules for pieces. The submission form and the Access Layer both
//! check against these, so every write path upholds the Piece invariants.

use url::Url;

use crate::{error::FieldErrors, protocol::NewPieceSubmission};

pub const MAX_IMAGES: usize = 5;
pub const MAX_FILE_SIZE_MB: usize = 5;
pub const MAX_FILE_SIZE_BYTES: usize = MAX_FILE_SIZE_MB * 1024 * 1024;

pub const NAME_LEN: (usize, usize) = (3, 100);
pub const DESCRIPTION_LEN: (usize, usize) = (10, 1000);
pub const MATERIALS_LEN: (usize, usize) = (3, 200);

pub const FIELD_NAME: &str = "name";
pub const FIELD_DESCRIPTION: &str = "description";
pub const FIELD_MATERIALS: &str = "materials";
pub const FIELD_CATEGORY: &str = "category_id";
pub const FIELD_HEIGHT: &str = "height";
pub const FIELD_WIDTH: &str = "width";
pub const FIELD_DEPTH: &str = "depth";
pub const FIELD_IMAGES: &str = "images";
pub const FIELD_OWNER: &str = "owner";

pub fn check_length(
    errors: &mut FieldErrors,
    field: &str,
    label: &str,
    value: &str,
    (min, max): (usize, usize),
) {
    let len = value.chars().count();
    if len < min {
        errors.add(
            field,
            format!("{label} must be at least {min} characters long."),
        );
    } else if len > max {
        errors.add(
            field,
            format!("{label} must be at most {max} characters long."),
        );
    }
}

pub fn check_category(errors: &mut FieldErrors, category_id: &str) {
    if category_id.trim().is_empty() {
        errors.add(FIELD_CATEGORY, "Please select a category.");
    }
}

pub fn positive_dimension_message(label: &str) -> String {
    format!("{label} must be a positive number.")
}

pub fn check_dimension(errors: &mut FieldErrors, field: &str, label: &str, value: Option<f64>) {
    if let Some(v) = value {
        if !v.is_finite() || v <= 0.0 {
            errors.add(field, positive_dimension_message(label));
        }
    }
}

/// Coerces raw form input into an optional dimension. Blank input is absent,
/// never zero.
pub fn parse_dimension(raw: &str, label: &str) -> Result<Option<f64>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Ok(Some(v)),
        _ => Err(positive_dimension_message(label)),
    }
}

pub fn check_images(errors: &mut FieldErrors, image_urls: &[String]) {
    if image_urls.len() > MAX_IMAGES {
        errors.add(
            FIELD_IMAGES,
            format!("You can upload a maximum of {MAX_IMAGES} images."),
        );
        return;
    }
    if image_urls.iter().any(|raw| Url::parse(raw).is_err()) {
        errors.add(FIELD_IMAGES, "Invalid image URL format.");
    }
}

pub fn check_submission(submission: &NewPieceSubmission) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    check_length(&mut errors, FIELD_NAME, "Name", &submission.name, NAME_LEN);
    check_length(
        &mut errors,
        FIELD_DESCRIPTION,
        "Description",
        &submission.description,
        DESCRIPTION_LEN,
    );
    check_length(
        &mut errors,
        FIELD_MATERIALS,
        "Materials",
        &submission.materials,
        MATERIALS_LEN,
    );
    check_category(&mut errors, submission.category_id.as_str());
    check_dimension(&mut errors, FIELD_HEIGHT, "Height", submission.height);
    check_dimension(&mut errors, FIELD_WIDTH, "Width", submission.width);
    check_dimension(&mut errors, FIELD_DEPTH, "Depth", submission.depth);
    check_images(&mut errors, &submission.image_urls);
    errors.into_result()
}

pub fn is_image_type(declared_type: &str) -> bool {
    declared_type
        .trim()
        .to_ascii_lowercase()
        .starts_with("image/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CategoryId;

    fn mug() -> NewPieceSubmission {
        NewPieceSubmission {
            name: "Mug".into(),
            description: "A nice little mug".into(),
            materials: "Clay".into(),
            category_id: CategoryId::from("cat3"),
            image_urls: Vec::new(),
            height: None,
            width: None,
            depth: None,
        }
    }

    #[test]
    fn accepts_minimal_submission() {
        check_submission(&mug()).expect("valid");
    }

    #[test]
    fn length_bounds_count_characters() {
        let mut submission = mug();
        submission.name = "Ké".into();
        let errors = check_submission(&submission).expect_err("too short");
        assert!(errors.contains(FIELD_NAME));

        submission.name = "é".repeat(100);
        check_submission(&submission).expect("100 chars is fine");

        submission.name.push('x');
        assert!(check_submission(&submission)
            .expect_err("too long")
            .contains(FIELD_NAME));
    }

    #[test]
    fn blank_dimension_is_absent_not_zero() {
        assert_eq!(parse_dimension("", "Height"), Ok(None));
        assert_eq!(parse_dimension("   ", "Height"), Ok(None));
        assert_eq!(parse_dimension("12.5", "Height"), Ok(Some(12.5)));
        assert!(parse_dimension("0", "Height").is_err());
        assert!(parse_dimension("-3", "Height").is_err());
        assert!(parse_dimension("abc", "Height").is_err());
        assert!(parse_dimension("inf", "Height").is_err());
    }

    #[test]
    fn rejects_non_positive_dimensions_and_too_many_images() {
        let mut submission = mug();
        submission.depth = Some(0.0);
        submission.image_urls = (0..6)
            .map(|i| format!("https://picsum.photos/seed/{i}/600/800"))
            .collect();
        let errors = check_submission(&submission).expect_err("invalid");
        assert_eq!(errors.get(FIELD_DEPTH), Some("Depth must be a positive number."));
        assert_eq!(
            errors.get(FIELD_IMAGES),
            Some("You can upload a maximum of 5 images.")
        );
    }

    #[test]
    fn data_uris_are_valid_image_urls() {
        let mut submission = mug();
        submission.image_urls = vec!["data:image/png;base64,iVBORw0KGgo=".into()];
        check_submission(&submission).expect("valid");

        submission.image_urls = vec!["not a url".into()];
        assert!(check_submission(&submission)
            .expect_err("invalid")
            .contains(FIELD_IMAGES));
    }

    #[test]
    fn classifies_image_types() {
        assert!(is_image_type("image/png"));
        assert!(is_image_type("Image/JPEG"));
        assert!(!is_image_type("application/pdf"));
        assert!(!is_image_type(""));
    }
}
