mod annotate;
pub use annotate::AnnotateApp;

mod batch;
pub use batch::BatchApp;

mod prepare;
pub use prepare::PrepareApp;
