use crate::annotation::AnnotationScanner;
use crate::model::{Package, SourceModel};
use crate::registry::Registry;
use log::{debug, info};
use std::collections::HashSet;

/// Traverses the import graph of a source model, scanning each package exactly once.
///
/// Roots are visited in model order; after each package its imports are followed depth-first
/// in declaration order, so the registry sees packages in a stable order.
pub struct PackageWalker<'m> {
    model: &'m SourceModel,
    visited: HashSet<&'m str>,
    registry: Registry,
}

impl<'m> PackageWalker<'m> {
    pub fn new(model: &'m SourceModel) -> Self {
        Self {
            model,
            visited: HashSet::new(),
            registry: Registry::new(),
        }
    }

    /// Scans the whole model and hands back the filled registry.
    pub fn walk(model: &'m SourceModel) -> Registry {
        let mut walker = Self::new(model);
        for root in model.roots() {
            walker.visit(root);
        }

        info!(
            "Scanned {} packages: {} routes, {} request and {} response declarations",
            walker.visited.len(),
            walker.registry.route_count(),
            walker.registry.requests().len(),
            walker.registry.responses().len()
        );
        walker.registry
    }

    fn visit(&mut self, package: &'m Package) {
        if !self.visited.insert(package.id.as_str()) {
            return;
        }

        AnnotationScanner::scan_package(package, &mut self.registry);

        for import in &package.imports {
            match self.model.package(import) {
                Some(imported) => self.visit(imported),
                None => debug!("Import {} of {} is not loaded", import, package.id),
            }
        }
    }
}
