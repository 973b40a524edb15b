//! Sample corpus and pre-wired test world.
//!
//! The corpus covers three procedures with enough chunk-type breadth to
//! exercise intent-scoped filtering, cross-tier enrichment, and rank
//! fusion: marriage registration, birth certificate issuance, and land-use
//! right registration.

use anyhow::Result;
use tthc_core::traits::{ChunkStore, Embedder, LexicalIndex};
use tthc_core::types::chunk::{Chunk, ChunkType, Tier};
use tthc_providers::mock::MockEmbedder;
use tthc_storage::{Bm25Index, InMemoryVectorStore, JsonChunkStore};

fn chunk(
    chunk_id: &str,
    procedure_id: &str,
    tier: Tier,
    chunk_type: ChunkType,
    content: &str,
    procedure_name: &str,
) -> Chunk {
    let mut metadata = std::collections::HashMap::new();
    metadata.insert(
        "procedure_name".to_string(),
        serde_json::Value::String(procedure_name.to_string()),
    );
    Chunk {
        chunk_id: chunk_id.to_string(),
        procedure_id: procedure_id.to_string(),
        tier,
        chunk_type,
        content: content.to_string(),
        token_count: content.split_whitespace().count() as u32,
        metadata,
        parent_context: (tier == Tier::Child).then(|| format!("{procedure_name}...")),
    }
}

/// The fixture corpus: one parent overview plus six child chunks per
/// procedure, for three procedures.
#[must_use]
pub fn sample_corpus() -> Vec<Chunk> {
    let mut chunks = Vec::new();

    chunks.push(chunk(
        "1.001-parent",
        "1.001",
        Tier::Parent,
        ChunkType::Overview,
        "Đăng ký kết hôn là thủ tục hành chính xác nhận quan hệ hôn nhân giữa hai công dân tại Ủy ban nhân dân cấp xã.",
        "Đăng ký kết hôn",
    ));
    chunks.push(chunk(
        "1.001-documents",
        "1.001",
        Tier::Child,
        ChunkType::Documents,
        "Hồ sơ đăng ký kết hôn gồm: tờ khai đăng ký kết hôn, chứng minh nhân dân hoặc căn cước công dân của hai bên, giấy xác nhận tình trạng hôn nhân.",
        "Đăng ký kết hôn",
    ));
    chunks.push(chunk(
        "1.001-requirements",
        "1.001",
        Tier::Child,
        ChunkType::Requirements,
        "Điều kiện đăng ký kết hôn: nam từ đủ 20 tuổi trở lên, nữ từ đủ 18 tuổi trở lên, việc kết hôn do nam và nữ tự nguyện quyết định.",
        "Đăng ký kết hôn",
    ));
    chunks.push(chunk(
        "1.001-process",
        "1.001",
        Tier::Child,
        ChunkType::Process,
        "Quy trình gồm các bước: nộp hồ sơ tại Ủy ban nhân dân cấp xã, cán bộ tư pháp kiểm tra hồ sơ, xác nhận và ghi vào sổ đăng ký kết hôn, trao giấy chứng nhận kết hôn.",
        "Đăng ký kết hôn",
    ));
    chunks.push(chunk(
        "1.001-legal",
        "1.001",
        Tier::Child,
        ChunkType::Legal,
        "Căn cứ pháp lý: Luật Hôn nhân và gia đình năm 2014, Nghị định số 123/2015/NĐ-CP về đăng ký và quản lý hộ tịch.",
        "Đăng ký kết hôn",
    ));
    chunks.push(chunk(
        "1.001-fees-timing",
        "1.001",
        Tier::Child,
        ChunkType::FeesTiming,
        "Lệ phí đăng ký kết hôn: miễn phí đối với công dân Việt Nam thường trú trong nước. Thời gian giải quyết: ngay trong ngày làm việc nếu hồ sơ hợp lệ.",
        "Đăng ký kết hôn",
    ));
    chunks.push(chunk(
        "1.001-agencies",
        "1.001",
        Tier::Child,
        ChunkType::Agencies,
        "Cơ quan tiếp nhận: Ủy ban nhân dân cấp xã nơi cư trú của một trong hai bên nam, nữ.",
        "Đăng ký kết hôn",
    ));

    chunks.push(chunk(
        "1.002-parent",
        "1.002",
        Tier::Parent,
        ChunkType::Overview,
        "Đăng ký khai sinh là thủ tục xác nhận sự kiện một trẻ em được sinh ra và cấp giấy khai sinh.",
        "Đăng ký khai sinh",
    ));
    chunks.push(chunk(
        "1.002-documents",
        "1.002",
        Tier::Child,
        ChunkType::Documents,
        "Hồ sơ khai sinh gồm: tờ khai đăng ký khai sinh, giấy chứng sinh do cơ sở y tế cấp, chứng minh nhân dân của cha mẹ.",
        "Đăng ký khai sinh",
    ));
    chunks.push(chunk(
        "1.002-requirements",
        "1.002",
        Tier::Child,
        ChunkType::Requirements,
        "Điều kiện: trẻ em phải được đăng ký khai sinh trong thời hạn 60 ngày kể từ ngày sinh.",
        "Đăng ký khai sinh",
    ));
    chunks.push(chunk(
        "1.002-process",
        "1.002",
        Tier::Child,
        ChunkType::Process,
        "Quy trình: nộp hồ sơ tại Ủy ban nhân dân cấp xã nơi cư trú, cán bộ tư pháp kiểm tra và ghi vào sổ hộ tịch, cấp giấy khai sinh.",
        "Đăng ký khai sinh",
    ));
    chunks.push(chunk(
        "1.002-legal",
        "1.002",
        Tier::Child,
        ChunkType::Legal,
        "Căn cứ pháp lý: Luật Hộ tịch năm 2014, Nghị định số 123/2015/NĐ-CP.",
        "Đăng ký khai sinh",
    ));
    chunks.push(chunk(
        "1.002-fees-timing",
        "1.002",
        Tier::Child,
        ChunkType::FeesTiming,
        "Lệ phí: miễn phí nếu đăng ký đúng hạn. Thời gian giải quyết: ngay trong ngày làm việc.",
        "Đăng ký khai sinh",
    ));
    chunks.push(chunk(
        "1.002-agencies",
        "1.002",
        Tier::Child,
        ChunkType::Agencies,
        "Cơ quan tiếp nhận: Ủy ban nhân dân cấp xã nơi cư trú của cha hoặc mẹ.",
        "Đăng ký khai sinh",
    ));

    chunks.push(chunk(
        "1.003-parent",
        "1.003",
        Tier::Parent,
        ChunkType::Overview,
        "Đăng ký quyền sử dụng đất là thủ tục xác lập quyền sử dụng đất hợp pháp cho người sử dụng đất.",
        "Đăng ký quyền sử dụng đất",
    ));
    chunks.push(chunk(
        "1.003-documents",
        "1.003",
        Tier::Child,
        ChunkType::Documents,
        "Hồ sơ gồm: đơn đăng ký, giấy tờ chứng minh quyền sử dụng đất, sơ đồ thửa đất.",
        "Đăng ký quyền sử dụng đất",
    ));
    chunks.push(chunk(
        "1.003-requirements",
        "1.003",
        Tier::Child,
        ChunkType::Requirements,
        "Điều kiện: đất không có tranh chấp, quyền sử dụng đất không bị kê biên để bảo đảm thi hành án.",
        "Đăng ký quyền sử dụng đất",
    ));
    chunks.push(chunk(
        "1.003-process",
        "1.003",
        Tier::Child,
        ChunkType::Process,
        "Quy trình: nộp hồ sơ tại Văn phòng đăng ký đất đai, thẩm định hồ sơ, thực địa, cấp giấy chứng nhận.",
        "Đăng ký quyền sử dụng đất",
    ));
    chunks.push(chunk(
        "1.003-legal",
        "1.003",
        Tier::Child,
        ChunkType::Legal,
        "Căn cứ pháp lý: Luật Đất đai năm 2013, Nghị định số 43/2014/NĐ-CP.",
        "Đăng ký quyền sử dụng đất",
    ));
    chunks.push(chunk(
        "1.003-fees-timing",
        "1.003",
        Tier::Child,
        ChunkType::FeesTiming,
        "Lệ phí: theo quy định của Hội đồng nhân dân cấp tỉnh. Thời gian giải quyết: không quá 30 ngày làm việc.",
        "Đăng ký quyền sử dụng đất",
    ));
    chunks.push(chunk(
        "1.003-agencies",
        "1.003",
        Tier::Child,
        ChunkType::Agencies,
        "Cơ quan tiếp nhận: Văn phòng đăng ký đất đai cấp huyện.",
        "Đăng ký quyền sử dụng đất",
    ));

    chunks
}

/// A fully wired chunk store, lexical index, vector store and embedder,
/// built from [`sample_corpus`]. Used by integration tests that exercise
/// the orchestrator end to end.
pub struct FixtureWorld {
    pub chunk_store: JsonChunkStore,
    pub lexical: Bm25Index,
    pub vector: InMemoryVectorStore,
    pub embedder: MockEmbedder,
}

impl FixtureWorld {
    /// Build the fixture world, embedding every chunk with the
    /// deterministic mock embedder.
    ///
    /// # Errors
    ///
    /// Returns an error if the sample corpus violates a chunk store
    /// invariant (it shouldn't) or an embedding call fails (it can't, the
    /// mock embedder is infallible).
    pub async fn build() -> Result<Self> {
        let chunks = sample_corpus();
        let ids: Vec<String> = chunks.iter().map(|c| c.chunk_id.clone()).collect();
        let embedder = MockEmbedder::standard();

        let mut vector = InMemoryVectorStore::new(embedder.dimensions());
        for chunk in &chunks {
            let embedding = embedder.embed(&chunk.content).await?;
            vector.upsert(
                chunk.chunk_id.clone(),
                embedding,
                chunk.tier,
                chunk.chunk_type,
                chunk.procedure_id.clone(),
            )?;
        }

        let chunk_store = JsonChunkStore::from_chunks(chunks)?;
        let lexical = Bm25Index::build(&chunk_store, &ids, 1.5, 0.75);

        Ok(Self {
            chunk_store,
            lexical,
            vector,
            embedder,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixture_world_builds_and_indexes_every_chunk() {
        let world = FixtureWorld::build().await.unwrap();
        assert_eq!(world.chunk_store.len(), sample_corpus().len());
        assert_eq!(world.lexical.stats().num_docs, sample_corpus().len());
    }
}
