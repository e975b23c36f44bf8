//! Assemble one combined model from several section models.
//!
//! Each physical table section contributes its own model; static link lines
//! connect buses of different sections. The combined model registers the
//! same entity handles, so results written through segments of the combined
//! model are visible through the section models too.

use crate::builder::ModelBuilder;
use crate::entity::{Line, Shared};
use crate::error::ModelResult;
use crate::model::Model;

/// Combine `sections` and `links` into one validated model.
///
/// Names must be unique across all sections, and every link must connect
/// buses that exist in some section.
pub fn combine(sections: &[Model], links: &[Shared<Line>]) -> ModelResult<Model> {
    let mut builder = ModelBuilder::new();
    for section in sections {
        builder.extend_from(section);
    }
    for link in links {
        builder.add_shared_line(link.clone());
    }
    let model = builder.build()?;
    tracing::debug!(
        sections = sections.len(),
        links = links.len(),
        buses = model.bus_count(),
        "combined section models"
    );
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Bus, Entity, Generator, Load, shared};
    use crate::error::ModelError;
    use crate::segment::segment;

    fn section(prefix: &str) -> Model {
        let mut builder = ModelBuilder::new();
        builder.add_bus(Bus::new(format!("{prefix}_bus"), 0.4));
        builder.add_generator(Generator::new(format!("{prefix}_gen"), format!("{prefix}_bus")));
        builder.add_load(Load::new(format!("{prefix}_load"), format!("{prefix}_bus")));
        builder.build().unwrap()
    }

    #[test]
    fn links_join_sections() {
        let sections = [section("s1"), section("s2"), section("s3")];
        let link = shared(Line::new("link_12", "s1_bus", "s2_bus"));

        let combined = combine(&sections, &[link.clone()]).unwrap();
        assert_eq!(combined.bus_count(), 3);
        assert_eq!(segment(&combined).len(), 2);

        link.write().set_active(false);
        assert_eq!(segment(&combined).len(), 3);
    }

    #[test]
    fn duplicate_names_across_sections_rejected() {
        let sections = [section("s1"), section("s1")];
        assert!(matches!(
            combine(&sections, &[]),
            Err(ModelError::DuplicateName { .. })
        ));
    }

    #[test]
    fn dangling_link_rejected() {
        let link = shared(Line::new("link", "s1_bus", "nowhere"));
        assert!(combine(&[section("s1")], &[link]).is_err());
    }
}
