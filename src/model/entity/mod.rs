mod user;
pub use user::{UserCreate, UserEntity};

mod module;
pub use module::{ContentSection, ModuleCreate, ModuleDifficulty, ModuleEntity, QuizQuestion};

mod progress;
pub use progress::{ProgressEntity, ProgressStatus};

mod assessment;
pub use assessment::{AssessmentCreate, AssessmentEntity};
