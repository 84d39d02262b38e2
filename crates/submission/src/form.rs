use shared::{
    domain::CategoryId,
    error::FieldErrors,
    protocol::NewPieceSubmission,
    rules::{
        check_category, check_images, check_length, parse_dimension, DESCRIPTION_LEN, FIELD_DEPTH,
        FIELD_DESCRIPTION, FIELD_HEIGHT, FIELD_MATERIALS, FIELD_NAME, FIELD_WIDTH, MATERIALS_LEN,
        NAME_LEN,
    },
};

/// Raw form fields exactly as typed. Dimensions stay strings until
/// validation so that an empty box means "absent".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PieceForm {
    pub name: String,
    pub description: String,
    pub materials: String,
    pub category_id: String,
    pub height: String,
    pub width: String,
    pub depth: String,
}

impl PieceForm {
    /// Applies the schema rules and normalizes the fields. `image_urls` are
    /// the staged images in display order.
    pub fn validate(&self, image_urls: &[String]) -> Result<NewPieceSubmission, FieldErrors> {
        let mut errors = FieldErrors::new();

        check_length(&mut errors, FIELD_NAME, "Name", &self.name, NAME_LEN);
        check_length(
            &mut errors,
            FIELD_DESCRIPTION,
            "Description",
            &self.description,
            DESCRIPTION_LEN,
        );
        check_length(
            &mut errors,
            FIELD_MATERIALS,
            "Materials",
            &self.materials,
            MATERIALS_LEN,
        );
        check_category(&mut errors, &self.category_id);

        let height = dimension(&mut errors, FIELD_HEIGHT, "Height", &self.height);
        let width = dimension(&mut errors, FIELD_WIDTH, "Width", &self.width);
        let depth = dimension(&mut errors, FIELD_DEPTH, "Depth", &self.depth);

        check_images(&mut errors, image_urls);
        errors.into_result()?;

        Ok(NewPieceSubmission {
            name: self.name.clone(),
            description: self.description.clone(),
            materials: self.materials.clone(),
            category_id: CategoryId(self.category_id.trim().to_string()),
            image_urls: image_urls.to_vec(),
            height,
            width,
            depth,
        })
    }
}

fn dimension(errors: &mut FieldErrors, field: &str, label: &str, raw: &str) -> Option<f64> {
    parse_dimension(raw, label).unwrap_or_else(|message| {
        errors.add(field, message);
        None
    })
}
