pub mod model_provider;
