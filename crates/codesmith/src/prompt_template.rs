use serde::Serialize;
use tera::{Context, Error as TeraError, Tera};

/// Render a tera template with the given context
pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    let rendered = tera.render("inline_template", &context)?;
    Ok(rendered.trim_end().to_string())
}
