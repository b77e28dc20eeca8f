//! Score weight table
//!
//! Origin weights are data, not code: the default keeps china one point above
//! the other regions, and a config file can equalize them.

use super::signals::Want;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub electric: i32,
    pub hybrid: i32,
    pub gas: i32,
    pub suv: i32,
    pub truck: i32,
    pub hatch: i32,
    pub sedan: i32,
    pub sport: i32,
    pub city: i32,
    pub budget: i32,
    pub china: i32,
    pub japan: i32,
    pub korea: i32,
    pub germany: i32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            electric: 4,
            hybrid: 3,
            gas: 2,
            suv: 3,
            truck: 3,
            hatch: 2,
            sedan: 2,
            sport: 2,
            city: 1,
            budget: 2,
            china: 4,
            japan: 3,
            korea: 3,
            germany: 3,
        }
    }
}

impl ScoreWeights {
    pub fn weight(&self, want: Want) -> i32 {
        match want {
            Want::Electric => self.electric,
            Want::Hybrid => self.hybrid,
            Want::Gas => self.gas,
            Want::Suv => self.suv,
            Want::Truck => self.truck,
            Want::Hatch => self.hatch,
            Want::Sedan => self.sedan,
            Want::Sport => self.sport,
            Want::City => self.city,
            Want::China => self.china,
            Want::Japan => self.japan,
            Want::Korea => self.korea,
            Want::Germany => self.germany,
        }
    }

    /// Same origin weight for every region
    pub fn with_equal_origins(mut self, weight: i32) -> Self {
        self.china = weight;
        self.japan = weight;
        self.korea = weight;
        self.germany = weight;
        self
    }
}
