mod pipeline_test;
mod primitives_test;
mod queue_test;
