//! Default catalog of beers and cellar tanks.
//!
//! Used to seed a fresh store before any configuration or sales history
//! has been provided.

use crate::types::*;
use once_cell::sync::Lazy;

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog);

/// Beers and tanks a brewery starts with
#[derive(Clone, Debug)]
pub struct Catalog {
    pub beers: Vec<BeerType>,
    pub tanks: Vec<Tank>,
}

impl Catalog {
    /// Check the catalog for duplicates and out-of-range tanks
    ///
    /// Returns one message per problem found.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (i, tank) in self.tanks.iter().enumerate() {
            if tank.capacity == 0 || tank.capacity > MAX_TANK_LITRES {
                errors.push(format!(
                    "Tank {} capacity {}L outside 1..={}",
                    tank.name, tank.capacity, MAX_TANK_LITRES
                ));
            }
            if self.tanks[..i].iter().any(|t| t.name == tank.name) {
                errors.push(format!("Duplicate tank name: {}", tank.name));
            }
        }

        for (i, beer) in self.beers.iter().enumerate() {
            if self.beers[..i].iter().any(|b| b.name == beer.name) {
                errors.push(format!("Duplicate beer name: {}", beer.name));
            }
        }

        errors
    }
}

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

/// Builds the default catalog of beers and tanks
pub fn build_default_catalog() -> Catalog {
    let beers = vec![
        BeerType::new("Organic Red Helles"),
        BeerType::new("Organic Pilsner"),
        BeerType::new("Organic Dunkel"),
    ];

    let tanks = vec![
        Tank::new("Albert", 1000, TankFunction::Both),
        Tank::new("Brigadier", 800, TankFunction::Both),
        Tank::new("Camilla", 1000, TankFunction::Both),
        Tank::new("Dylon", 800, TankFunction::Both),
        Tank::new("Emily", 1000, TankFunction::Both),
        Tank::new("Florence", 800, TankFunction::Both),
        Tank::new("Gertrude", 680, TankFunction::Conditioner),
        Tank::new("Harry", 680, TankFunction::Conditioner),
        Tank::new("R2D2", 800, TankFunction::Fermenter),
    ];

    Catalog { beers, tanks }
}
