//! Binding-site registry
//!
//! A binding configuration is a fixed set of ports laid out in a bound
//! particle's local frame. The registry is a table keyed by small integer
//! id; adding a configuration never touches the engine.

use serde::{Deserialize, Serialize};

use super::particle::BoundParticle;
use crate::consts::{LATTICE_SPACING, MAX_CONFIG_ID};
use crate::error::{FieldError, Result};
use crate::vector::Vector2;
use crate::{heading_degrees, normalize_degrees, polar_to_cartesian};

/// One attachment site, relative to the owning particle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Port {
    /// Degrees, before the owner's rotation is applied
    pub angle: f64,
    pub radius: f64,
}

impl Port {
    pub const fn new(angle: f64, radius: f64) -> Self {
        Self { angle, radius }
    }
}

/// How a newly attached particle is rotated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Alignment {
    /// Inherit the parent's rotation; keeps growth crystalline
    #[default]
    Lattice,
    /// Rotate so the child's port 0 points back at the parent
    Port,
    /// Rotate to the free particle's heading at capture (much less regular)
    Free,
}

/// Port layout plus attachment rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingConfig {
    ports: Vec<Port>,
    /// Most ports that may be occupied by children
    max_binds: u32,
    align: Alignment,
}

impl BindingConfig {
    /// Arbitrary layout; every port may take a child
    pub fn new(ports: Vec<Port>, align: Alignment) -> Self {
        let max_binds = ports.len() as u32;
        Self {
            ports,
            max_binds,
            align,
        }
    }

    /// `count` ports centred in equal sectors, e.g. 30, 90, 150.. for six.
    /// One port is left for the particle's own attachment.
    pub fn ring(count: usize, radius: f64, align: Alignment) -> Self {
        let width = 360.0 / count.max(1) as f64;
        let ports = (0..count)
            .map(|i| Port::new(width * (i as f64 + 0.5), radius))
            .collect();
        Self {
            ports,
            max_binds: count.saturating_sub(1) as u32,
            align,
        }
    }

    pub fn tri(radius: f64) -> Self {
        Self::ring(3, radius, Alignment::Lattice)
    }

    pub fn square(radius: f64) -> Self {
        Self::ring(4, radius, Alignment::Lattice)
    }

    pub fn penta(radius: f64) -> Self {
        Self::ring(5, radius, Alignment::Lattice)
    }

    pub fn hexa(radius: f64) -> Self {
        Self::ring(6, radius, Alignment::Lattice)
    }

    pub fn with_max_binds(mut self, max_binds: u32) -> Self {
        self.max_binds = max_binds.min(self.ports.len() as u32);
        self
    }

    pub fn with_alignment(mut self, align: Alignment) -> Self {
        self.align = align;
        self
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    pub fn max_binds(&self) -> u32 {
        self.max_binds
    }

    pub fn alignment(&self) -> Alignment {
        self.align
    }

    /// Furthest port from the owner's centre
    pub fn reach(&self) -> f64 {
        self.ports.iter().map(|p| p.radius).fold(0.0, f64::max)
    }

    /// World angle of a port on an owner rotated by `rot`
    pub fn port_angle(&self, port: usize, rot: f64) -> Option<f64> {
        self.ports
            .get(port)
            .map(|p| normalize_degrees(p.angle + rot))
    }

    /// World position of a port on an owner at `pos` rotated by `rot`
    pub fn port_position(&self, port: usize, pos: Vector2, rot: f64) -> Option<Vector2> {
        self.ports
            .get(port)
            .map(|p| pos + polar_to_cartesian(p.radius, p.angle + rot))
    }

    /// All ports of an owner as (port index, world position)
    pub fn world_ports(&self, pos: Vector2, rot: f64) -> impl Iterator<Item = (usize, Vector2)> + '_ {
        self.ports
            .iter()
            .enumerate()
            .map(move |(i, p)| (i, pos + polar_to_cartesian(p.radius, p.angle + rot)))
    }

    /// Rotation for a child attached at `port` of a parent rotated by `parent_rot`
    ///
    /// The child carries the same configuration as its parent. `heading` is
    /// the captured particle's velocity and only matters for `Alignment::Free`.
    pub fn child_rotation(&self, port: usize, parent_rot: f64, heading: Vector2) -> f64 {
        match self.align {
            Alignment::Lattice => normalize_degrees(parent_rot),
            Alignment::Port => {
                let back = self.port_angle(port, parent_rot).unwrap_or(0.0) + 180.0;
                let own = self.ports.first().map_or(0.0, |p| p.angle);
                normalize_degrees(back - own)
            }
            Alignment::Free => {
                if heading == Vector2::ZERO {
                    normalize_degrees(parent_rot)
                } else {
                    heading_degrees(heading)
                }
            }
        }
    }
}

/// Binding configurations by id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    configs: Vec<Option<BindingConfig>>,
}

impl Default for Registry {
    /// The single hexagonal ring the engine grows by default (id 0)
    fn default() -> Self {
        Self {
            configs: vec![Some(BindingConfig::hexa(LATTICE_SPACING))],
        }
    }
}

impl Registry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            configs: Vec::new(),
        }
    }

    /// Install a configuration under `id`, returning the one it replaces
    pub fn register(&mut self, id: u32, config: BindingConfig) -> Result<Option<BindingConfig>> {
        if id > MAX_CONFIG_ID {
            return Err(FieldError::InvalidConfig(format!(
                "binding configuration id {id} exceeds {MAX_CONFIG_ID}"
            )));
        }
        if config.port_count() > u32::BITS as usize {
            return Err(FieldError::InvalidConfig(format!(
                "binding configuration has {} ports, at most {} fit the port mask",
                config.port_count(),
                u32::BITS
            )));
        }
        let index = id as usize;
        if self.configs.len() <= index {
            self.configs.resize(index + 1, None);
        }
        Ok(self.configs[index].replace(config))
    }

    /// Builder form of `register`
    pub fn with(mut self, id: u32, config: BindingConfig) -> Result<Self> {
        self.register(id, config)?;
        Ok(self)
    }

    pub fn get(&self, config_id: u32) -> Result<&BindingConfig> {
        self.configs
            .get(config_id as usize)
            .and_then(Option::as_ref)
            .ok_or(FieldError::UnknownConfiguration { config_id })
    }

    pub fn contains(&self, config_id: u32) -> bool {
        self.get(config_id).is_ok()
    }

    /// World-space ports of a bound particle, in port order
    pub fn world_ports(&self, particle: &BoundParticle) -> Result<Vec<(usize, Vector2)>> {
        let config = self.get(particle.binding.config_id)?;
        Ok(config.world_ports(particle.pos, particle.rot).collect())
    }

    /// Largest port radius across all configurations
    pub fn max_reach(&self) -> f64 {
        self.configs
            .iter()
            .flatten()
            .map(BindingConfig::reach)
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vector2, b: Vector2) -> bool {
        a.distance(b) < 1e-9
    }

    #[test]
    fn test_square_port_angles() {
        let cfg = BindingConfig::square(5.0);
        assert_eq!(cfg.port_angle(0, 0.0), Some(45.0));
        assert_eq!(cfg.port_angle(1, 0.0), Some(135.0));
        assert_eq!(cfg.port_angle(2, 0.0), Some(225.0));
        assert_eq!(cfg.port_angle(3, 0.0), Some(315.0));
        assert_eq!(cfg.port_angle(4, 0.0), None);
        assert_eq!(cfg.port_angle(3, 90.0), Some(45.0));
        assert_eq!(cfg.max_binds(), 3);
    }

    #[test]
    fn test_hexa_world_ports_rotate_and_translate() {
        let cfg = BindingConfig::hexa(5.0);
        let origin = Vector2::new(10.0, -2.0);
        let ports: Vec<_> = cfg.world_ports(origin, 60.0).collect();
        assert_eq!(ports.len(), 6);
        for (i, site) in &ports {
            assert!((site.distance(origin) - 5.0).abs() < 1e-9);
            assert!(close(*site, cfg.port_position(*i, origin, 60.0).unwrap()));
        }
        // Port 0 sits at 30 + 60 = 90 degrees
        assert!(close(ports[0].1, origin + Vector2::new(0.0, 5.0)));
    }

    #[test]
    fn test_child_rotation_policies() {
        let lattice = BindingConfig::hexa(5.0);
        assert_eq!(lattice.child_rotation(2, 400.0, Vector2::X), 40.0);

        // Port alignment: child's port 0 (45 deg) faces back along 135 + 180
        let port = BindingConfig::square(5.0).with_alignment(Alignment::Port);
        let rot = port.child_rotation(1, 0.0, Vector2::X);
        assert!((rot - 270.0).abs() < 1e-9);
        let back = port.port_angle(0, rot).unwrap();
        assert!((back - 315.0).abs() < 1e-9);

        let free = BindingConfig::hexa(5.0).with_alignment(Alignment::Free);
        assert!((free.child_rotation(0, 0.0, Vector2::new(0.0, -2.0)) - 270.0).abs() < 1e-9);
        assert_eq!(free.child_rotation(0, 15.0, Vector2::ZERO), 15.0);
    }

    #[test]
    fn test_lattice_hexa_child_faces_parent() {
        // A lattice child of an even ring always has a port on its parent
        let cfg = BindingConfig::hexa(5.0);
        for port in 0..6 {
            let child_pos = cfg.port_position(port, Vector2::ZERO, 0.0).unwrap();
            let rot = cfg.child_rotation(port, 0.0, Vector2::ZERO);
            assert!(
                cfg.world_ports(child_pos, rot)
                    .any(|(_, site)| site.length() < 1e-9),
                "port {port}"
            );
        }
    }

    #[test]
    fn test_registry_lookup() {
        let registry = Registry::default();
        assert!(registry.contains(0));
        assert!(matches!(
            registry.get(3),
            Err(FieldError::UnknownConfiguration { config_id: 3 })
        ));

        let particle = BoundParticle::seed(Vector2::ZERO, 0);
        assert_eq!(registry.world_ports(&particle).unwrap().len(), 6);

        let stray = BoundParticle::seed(Vector2::ZERO, 9);
        assert!(registry.world_ports(&stray).is_err());
    }

    #[test]
    fn test_registry_register_extends_table() {
        let registry = Registry::default()
            .with(4, BindingConfig::tri(8.0))
            .unwrap();
        assert!(registry.contains(4));
        assert!(!registry.contains(2));
        assert_eq!(registry.max_reach(), 8.0);

        let mut registry = Registry::new();
        assert!(registry.register(MAX_CONFIG_ID + 1, BindingConfig::tri(1.0)).is_err());
        let replaced = registry.register(0, BindingConfig::tri(1.0)).unwrap();
        assert!(replaced.is_none());
        let replaced = registry.register(0, BindingConfig::square(1.0)).unwrap();
        assert_eq!(replaced, Some(BindingConfig::tri(1.0)));
    }
}
