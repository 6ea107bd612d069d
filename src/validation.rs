//! Structural validation of an engine's output.
//!
//! Checks the dense stream and its address table after an `execute` call.
//! Useful for tests and for catching clipper bugs during development.

use crate::clipper::MAX_CLIPPED_VERTICES;
use crate::{Clipper, GeomSetupEngine, PassThroughPolicy, VertexSource};

/// Result of [`validate_setup`].
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Number of clip packages in the last call.
    pub num_packages: usize,
    /// Length of the dense vertex stream.
    pub num_vertices: usize,

    /// Address table does not have `num_packages + 1` entries starting at 0.
    pub malformed_address_table: bool,
    /// Positions `i` where `address[i + 1] != address[i] + count[i]`.
    pub address_mismatches: usize,
    /// Final address differs from the dense length.
    pub total_mismatch: bool,

    /// Packages whose vertex count is not a multiple of 3.
    pub partial_triangle_packages: usize,
    /// Packages with more handles than their primitives could produce.
    pub oversized_packages: usize,

    /// Dense handles that are `INVALID` or fail to resolve.
    pub unresolved_handles: usize,
    /// Resolved vertices with non-finite position components.
    pub non_finite_vertices: usize,

    /// Pass-through indices out of range or out of order.
    pub bad_pass_through: usize,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        !self.malformed_address_table
            && self.address_mismatches == 0
            && !self.total_mismatch
            && self.partial_triangle_packages == 0
            && self.oversized_packages == 0
            && self.unresolved_handles == 0
            && self.non_finite_vertices == 0
            && self.bad_pass_through == 0
    }

    /// Format a summary of any issues found.
    pub fn summary(&self) -> String {
        let mut issues = Vec::new();

        if self.malformed_address_table {
            issues.push("malformed address table".to_string());
        }
        if self.address_mismatches > 0 {
            issues.push(format!(
                "{} address/count mismatches",
                self.address_mismatches
            ));
        }
        if self.total_mismatch {
            issues.push("address total differs from dense length".to_string());
        }
        if self.partial_triangle_packages > 0 {
            issues.push(format!(
                "{} packages with partial triangles",
                self.partial_triangle_packages
            ));
        }
        if self.oversized_packages > 0 {
            issues.push(format!("{} oversized packages", self.oversized_packages));
        }
        if self.unresolved_handles > 0 {
            issues.push(format!("{} unresolved handles", self.unresolved_handles));
        }
        if self.non_finite_vertices > 0 {
            issues.push(format!(
                "{} non-finite vertices",
                self.non_finite_vertices
            ));
        }
        if self.bad_pass_through > 0 {
            issues.push(format!(
                "{} bad pass-through indices",
                self.bad_pass_through
            ));
        }

        if issues.is_empty() {
            "Valid".to_string()
        } else {
            issues.join(", ")
        }
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ValidationReport {{ packages={}, vertices={}, {} }}",
            self.num_packages,
            self.num_vertices,
            self.summary()
        )
    }
}

/// Validate the output of the engine's last `execute` call against the
/// vertex source it ran on.
pub fn validate_setup<C, V>(engine: &GeomSetupEngine<C>, source: &V) -> ValidationReport
where
    C: Clipper,
    V: VertexSource + ?Sized,
{
    let counts = engine.package_vertex_counts();
    let addresses = engine.compacted_addresses();
    let dense = engine.compacted_vertices();
    let clip_package_size = engine.config().clip_package_size;

    let mut report = ValidationReport {
        num_packages: engine.package_count(),
        num_vertices: dense.len(),
        ..Default::default()
    };

    report.malformed_address_table =
        addresses.len() != counts.len() + 1 || addresses.first() != Some(&0);

    if !report.malformed_address_table {
        report.address_mismatches = addresses
            .windows(2)
            .zip(counts)
            .filter(|&(w, &c)| w[1] != w[0].wrapping_add(c))
            .count();
        report.total_mismatch = addresses.last().map(|&a| a as usize) != Some(dense.len());
    }

    let max_per_package = (MAX_CLIPPED_VERTICES * clip_package_size) as u32;
    for &count in counts {
        if count % 3 != 0 {
            report.partial_triangle_packages += 1;
        }
        if count > max_per_package {
            report.oversized_packages += 1;
        }
    }

    for &handle in dense {
        match engine.resolve(source, handle) {
            Some(vertex) => {
                if !vertex.position.is_finite() {
                    report.non_finite_vertices += 1;
                }
            }
            None => report.unresolved_handles += 1,
        }
    }

    let pass_through = engine.pass_through_primitives();
    let primitive_limit = source.vertex_count() / 3;
    let mut previous: Option<u32> = None;
    for &prim in pass_through {
        let in_order = previous.is_none_or(|p| p < prim);
        if prim as usize >= primitive_limit || !in_order {
            report.bad_pass_through += 1;
        }
        previous = Some(prim);
    }
    if engine.config().pass_through == PassThroughPolicy::Merge && !pass_through.is_empty() {
        report.bad_pass_through += pass_through.len();
    }

    report
}
