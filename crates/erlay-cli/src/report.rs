//! Plain-text layout report.

use std::fmt::{self, Write};

use erlay::Layout;
use erlay_core::schema::Field;

/// Render `layout` as a plain-text report.
///
/// The report lists the layers with their entities in order, followed by
/// one line per entity with its box and field order.
pub fn render(layout: &Layout) -> String {
    let mut out = String::new();
    write_report(&mut out, layout).expect("Writing to String buffer is infallible");
    out
}

fn write_report(out: &mut impl Write, layout: &Layout) -> fmt::Result {
    let refinement = layout.refinement();
    writeln!(out, "layers: {}", layout.layer_count())?;
    writeln!(
        out,
        "crossings: {} -> {} ({} iterations, {} swaps)",
        refinement.initial_crossings(),
        refinement.final_crossings(),
        refinement.iterations(),
        refinement.swaps()
    )?;

    writeln!(out)?;
    for (index, layer) in layout.layers().iter().enumerate() {
        writeln!(out, "layer {index}: {}", layer.join(", "))?;
    }

    writeln!(out)?;
    for layer in layout.layers() {
        for name in layer {
            let (Some(entity), Some(bounds)) = (layout.entity(name), layout.bounds_of(name)) else {
                continue;
            };
            let fields: Vec<&str> = entity.fields().iter().map(Field::name).collect();
            writeln!(
                out,
                "{name}: x={} y={} w={} h={} fields=[{}]",
                bounds.min_x(),
                bounds.min_y(),
                bounds.width(),
                bounds.height(),
                fields.join(", ")
            )?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use erlay::LayoutBuilder;
    use erlay_core::schema::{Cardinality, Endpoint, Entity, Relationship};

    use super::*;

    #[test]
    fn test_render_report() {
        let entities = vec![
            Entity::new("users", vec![Field::new("id", "int").with_primary_key(true)]),
            Entity::new(
                "posts",
                vec![
                    Field::new("title", "text"),
                    Field::new("id", "int").with_primary_key(true),
                ],
            ),
        ];
        let relationships = vec![Relationship::new(
            Endpoint::new("posts", "id"),
            Endpoint::new("users", "id"),
            Cardinality::ManyToOne,
        )];
        let layout = LayoutBuilder::default()
            .layout(&entities, &relationships)
            .unwrap();

        let report = render(&layout);

        assert!(report.starts_with("layers: 2\ncrossings: 0 -> 0"));
        assert!(report.contains("layer 0: posts\nlayer 1: users\n"));
        assert!(report.contains("posts: x=50 y=50 w=250 h=96 fields=[id, title]"));
        assert!(report.contains("users: x=450 y="));
    }
}
