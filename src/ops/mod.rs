/*
 * @Author       : 老董
 * @Date         : 2026-02-04
 * @Description  : 与具体层无关的底层运算（分段归约等），供 pooling / conv 等层复用
 */

mod segment;

pub use segment::{Reduction, segment_reduce, segment_softmax};
