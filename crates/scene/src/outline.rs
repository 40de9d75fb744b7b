use crate::graph::Scene;
use vrctl_common::EntityId;

/// Produce an indented, human-readable outline of the subtree under `root`.
///
/// One line per node: name, layer, and renderer/material state. Useful for
/// CLI output, logging, and asserting on scene state in tests.
pub fn outline(scene: &Scene, root: EntityId) -> String {
    let mut out = String::new();
    write_node(scene, root, 0, &mut out);
    out
}

fn write_node(scene: &Scene, id: EntityId, depth: usize, out: &mut String) {
    let Some(node) = scene.get(id) else {
        return;
    };
    out.push_str(&"  ".repeat(depth));
    out.push_str(&format!("{} [layer={}]", node.name, node.layer.0));
    if let Some(r) = node.renderer {
        out.push_str(&format!(
            " {:?} {}",
            r.kind,
            if r.enabled { "on" } else { "off" }
        ));
        if let Some(m) = scene.material_of(id) {
            let c = m.color.0;
            out.push_str(&format!(
                " shader={} color=({:.2}, {:.2}, {:.2}, {:.2}) zwrite={}",
                m.shader.name(),
                c.x,
                c.y,
                c.z,
                c.w,
                m.depth_write
            ));
        }
    }
    out.push('\n');
    for child in scene.children(id) {
        write_node(scene, *child, depth + 1, out);
    }
}
