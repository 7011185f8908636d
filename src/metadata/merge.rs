//! Reconciliation of synthesized metadata with metadata a dataset already has.

use std::collections::HashMap;

use super::tree::Element;

/// Top-level FGDC sections dropped when migrating legacy metadata.
pub const FGDC_SECTIONS: [&str; 8] = [
    "idinfo", "dataqual", "spdoinfo", "spref", "eainfo", "distinfo", "metainfo", "smusrdef",
];

/// Merges `incoming` into `base` and returns the merged tree.
///
/// Children are joined on tag name. A leaf in `incoming` overwrites the text
/// (and overlays the attributes) of the base element with the same tag, or
/// is appended when the base has none. A nested element in `incoming` is
/// merged recursively into the base element with the same tag, or appended.
/// When several base siblings share a tag the last one is the join target,
/// and an appended element becomes the target for later siblings.
pub fn merge(base: &Element, incoming: &Element) -> Element {
    let mut merged = base.clone();
    merge_into(&mut merged, incoming);
    merged
}

fn merge_into(base: &mut Element, incoming: &Element) {
    let mut by_tag: HashMap<&str, usize> = HashMap::new();
    for (i, child) in base.children.iter().enumerate() {
        by_tag.insert(child.name.as_str(), i);
    }
    // Indices are resolved against `base.children` after the loop borrows end.
    let mut targets: Vec<Option<usize>> = Vec::with_capacity(incoming.children.len());
    let mut appended = base.children.len();
    for child in &incoming.children {
        match by_tag.get(child.name.as_str()) {
            Some(&i) => targets.push(Some(i)),
            None => {
                by_tag.insert(child.name.as_str(), appended);
                appended += 1;
                targets.push(None);
            }
        }
    }

    for (child, target) in incoming.children.iter().zip(targets) {
        match target {
            Some(i) if child.is_leaf() => {
                let existing = &mut base.children[i];
                existing.set_text(child.text.clone());
                for (key, value) in &child.attributes {
                    existing.set_attribute(key, value);
                }
            }
            Some(i) => merge_into(&mut base.children[i], child),
            None => base.children.push(child.clone()),
        }
    }
}

/// Legacy reconciliation: appends every template section to the prior
/// document and strips FGDC sections, normalizing backslashes in text.
pub fn merge_legacy(prior: &Element, template: &Element) -> Element {
    let mut merged = prior.clone();
    merged.children.extend(template.children.iter().cloned());
    strip_fgdc_sections(&mut merged);
    merged.walk_mut(&mut |el| {
        if let Some(text) = &el.text {
            if text.contains('\\') {
                el.text = Some(text.replace('\\', "/"));
            }
        }
    });
    merged
}

/// Removes all FGDC sections from the document.
pub fn strip_fgdc_sections(document: &mut Element) {
    document.remove_descendants(&|name| FGDC_SECTIONS.contains(&name));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, text: &str) -> Element {
        Element::new(name).with_text(text)
    }

    fn template() -> Element {
        Element::new("metadata")
            .with_child(leaf("mdFileID", "file://a.shp"))
            .with_child(
                Element::new("dataIdInfo")
                    .with_child(
                        Element::new("idCitation").with_child(leaf("resTitle", "Roads")),
                    )
                    .with_child(leaf("idAbs", "generated")),
            )
            .with_child(
                Element::new("distInfo").with_child(
                    Element::new("distTranOps")
                        .with_child(Element::new("onLineSrc").with_child(leaf("linkage", "https://a")))
                        .with_child(Element::new("onLineSrc").with_child(leaf("linkage", "file://a"))),
                ),
            )
    }

    #[test]
    fn test_merge_with_empty_prior_keeps_template() {
        let template = template();
        let prior = Element::new("metadata");
        assert_eq!(merge(&template, &prior), template);
    }

    #[test]
    fn test_merge_with_itself_is_idempotent() {
        let template = template();
        assert_eq!(merge(&template, &template), template);
    }

    #[test]
    fn test_prior_leaf_values_win() {
        let prior = Element::new("metadata")
            .with_child(leaf("mdFileID", "{1234}"))
            .with_child(
                Element::new("dataIdInfo")
                    .with_child(
                        Element::new("idCitation").with_child(leaf("resTitle", "Road network")),
                    )
                    .with_child(leaf("idAbs", "curated abstract")),
            );

        let merged = merge(&template(), &prior);
        assert_eq!(merged.text_at(&["mdFileID"]), Some("{1234}"));
        assert_eq!(
            merged.text_at(&["dataIdInfo", "idCitation", "resTitle"]),
            Some("Road network")
        );
        assert_eq!(
            merged.text_at(&["dataIdInfo", "idAbs"]),
            Some("curated abstract")
        );
        // untouched template sections survive
        assert!(merged.find(&["distInfo", "distTranOps"]).is_some());
        assert_eq!(merged.children.len(), 3);
    }

    #[test]
    fn test_missing_elements_are_added() {
        let prior = Element::new("metadata")
            .with_child(Element::new("Binary").with_child(leaf("Thumbnail", "base64")))
            .with_child(
                Element::new("dataIdInfo").with_child(leaf("idPurp", "Transportation planning")),
            );

        let merged = merge(&template(), &prior);
        assert_eq!(merged.text_at(&["Binary", "Thumbnail"]), Some("base64"));
        assert_eq!(
            merged.text_at(&["dataIdInfo", "idPurp"]),
            Some("Transportation planning")
        );
        assert_eq!(merged.text_at(&["dataIdInfo", "idAbs"]), Some("generated"));
        assert_eq!(merged.children.last().unwrap().name, "Binary");
    }

    #[test]
    fn test_repeated_incoming_tags_do_not_duplicate() {
        let base = Element::new("searchKeys").with_child(leaf("keyword", "ShapeFile"));
        let incoming = Element::new("searchKeys")
            .with_child(leaf("keyword", "roads"))
            .with_child(leaf("keyword", "transport"));
        let merged = merge(&base, &incoming);
        assert_eq!(merged.children, vec![leaf("keyword", "transport")]);

        let merged = merge(&Element::new("searchKeys"), &incoming);
        assert_eq!(merged.children, vec![leaf("keyword", "transport")]);
    }

    #[test]
    fn test_leaf_attributes_are_overlaid() {
        let mut base_role = Element::new("RoleCd");
        base_role.set_attribute("value", "006");
        let mut prior_role = Element::new("RoleCd");
        prior_role.set_attribute("value", "005");

        let merged = merge(
            &Element::new("role").with_child(base_role),
            &Element::new("role").with_child(prior_role),
        );
        assert_eq!(merged.children[0].attribute("value"), Some("005"));
    }

    #[test]
    fn test_legacy_merge_strips_fgdc_sections() {
        let prior = Element::new("metadata")
            .with_child(Element::new("idinfo").with_child(leaf("citation", "old")))
            .with_child(Element::new("spref"))
            .with_child(leaf("Esri", r"C:\data\roads"));

        let merged = merge_legacy(&prior, &template());
        assert!(merged.child("idinfo").is_none());
        assert!(merged.child("spref").is_none());
        assert_eq!(merged.text_at(&["Esri"]), Some("C:/data/roads"));
        assert_eq!(merged.text_at(&["mdFileID"]), Some("file://a.shp"));
        assert_eq!(merged.children.len(), 4);
    }
}
