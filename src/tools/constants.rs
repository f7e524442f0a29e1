//! 常量和默认配置集中管理
//!
//! 将所有重要常量集中定义，避免"默认值漂移"和重复定义

/// 内容嗅探常量
pub mod sniffing {
    /// 嵌入式载荷搜索窗口（字节）
    ///
    /// 部分缓存条目在音频容器前带有自定义头，头部通常远小于4KB
    pub const DEFAULT_SEARCH_WINDOW: usize = 4096;

    /// gzip魔数
    pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
}

/// 默认配置值
pub mod defaults {
    /// 候选文件最小字节数，更小的文件不可能是有效音频
    pub const MIN_CANDIDATE_SIZE: u64 = 10;

    /// 扫描队列容量 = 工作线程数 × 该倍数
    pub const QUEUE_CAPACITY_PER_WORKER: usize = 2;

    /// 默认输出目录名（位于缓存根目录下时自动排除扫描）
    pub const OUTPUT_DIR_NAME: &str = "extracted_assets";

    /// 默认索引文件名
    pub const INDEX_FILE_NAME: &str = "extracted_index.jsonl";

    /// 写权限探测文件名
    pub const WRITE_PROBE_NAME: &str = ".write_probe";

    /// 单个载荷（解压后）的最大字节数，防止gzip炸弹耗尽内存
    pub const MAX_PAYLOAD_SIZE: u64 = 256 * 1024 * 1024;
}

/// 并发度限制常量
pub mod parallel_limits {
    /// 最小并发度
    ///
    /// 任何并行处理至少需要1个线程/工作单元
    pub const MIN_PARALLEL_DEGREE: usize = 1;

    /// 最大并发度
    ///
    /// 提取以磁盘I/O为主，超过32个线程不再带来收益
    pub const MAX_PARALLEL_DEGREE: usize = 32;
}

/// 按大小分类的输出桶
pub mod size_buckets {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;

    /// (上限（不含）, 目录名)，按上限递增排列
    pub const BUCKETS: &[(u64, &str)] = &[
        (50 * KB, "ultra_small_0-50KB"),
        (200 * KB, "small_50-200KB"),
        (MB, "medium_200KB-1MB"),
        (5 * MB, "large_1MB-5MB"),
    ];

    /// 超过全部上限的文件
    pub const LARGEST: &str = "ultra_large_5MB+";
}

/// 游戏缓存位置
pub mod cache_paths {
    /// 缓存目录名
    pub const STORAGE_DIR: &str = "rbx-storage";

    /// `directories::ProjectDirs` 使用的应用标识
    pub const QUALIFIER: &str = "";
    pub const ORGANIZATION: &str = "";
    pub const APPLICATION: &str = "cache-audio-extractor";
}
