mod assessment;
mod ids;
mod result;

pub use assessment::{AssessmentDefinition, AssessmentError, Question};
pub use ids::{AssessmentId, AttemptId, IdError, UserId};
pub use result::{AssessmentResult, QuestionOutcome, ResultContext, ResultError, ResultRecord};
