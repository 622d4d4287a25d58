// --- Файл: src/losses/registry.rs ---

//! Name -> constructor table for loss kinds.

use super::{
    CeLoss, CenterLoss, EmlLoss, Loss, MsmLoss, NpairsLoss, TriHardLoss, TripletLoss,
    TripletLossV2,
};
use crate::config::Params;
use crate::error::ConfigError;

/// Every loss kind a configuration may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LossKind {
    Ce,
    Triplet,
    TripletV2,
    Msm,
    Eml,
    Npairs,
    TriHard,
    Center,
}

impl LossKind {
    pub const ALL: [LossKind; 8] = [
        LossKind::Ce,
        LossKind::Triplet,
        LossKind::TripletV2,
        LossKind::Msm,
        LossKind::Eml,
        LossKind::Npairs,
        LossKind::TriHard,
        LossKind::Center,
    ];

    /// Configuration name of the kind.
    pub fn name(self) -> &'static str {
        match self {
            LossKind::Ce => "CELoss",
            LossKind::Triplet => "TripletLoss",
            LossKind::TripletV2 => "TripletLossV2",
            LossKind::Msm => "MSMLoss",
            LossKind::Eml => "EmlLoss",
            LossKind::Npairs => "NpairsLoss",
            LossKind::TriHard => "TriHardLoss",
            LossKind::Center => "CenterLoss",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| ConfigError::UnknownKind {
                category: "loss",
                name: name.to_string(),
                known: Self::ALL.iter().map(|kind| kind.name()).collect(),
            })
    }

    /// Constructs the loss from its parameters (without `weight`).
    pub fn build(self, params: Params) -> Result<Box<dyn Loss>, ConfigError> {
        let loss: Box<dyn Loss> = match self {
            LossKind::Ce => Box::new(CeLoss::from_params(params)?),
            LossKind::Triplet => Box::new(TripletLoss::from_params(params)?),
            LossKind::TripletV2 => Box::new(TripletLossV2::from_params(params)?),
            LossKind::Msm => Box::new(MsmLoss::from_params(params)?),
            LossKind::Eml => Box::new(EmlLoss::from_params(params)?),
            LossKind::Npairs => Box::new(NpairsLoss::from_params(params)?),
            LossKind::TriHard => Box::new(TriHardLoss::from_params(params)?),
            LossKind::Center => Box::new(CenterLoss::from_params(params)?),
        };
        Ok(loss)
    }
}
