pub mod mask_loading;
pub mod output;
pub mod prediction_loading;
